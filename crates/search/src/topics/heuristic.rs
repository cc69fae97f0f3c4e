//! Pattern-based topic extraction
//!
//! Frequency-ranked words and bigrams from the title and abstract, plus
//! substring pattern tables for well-known domains and methodologies.

use super::TopicExtractor;
use reviewer_finder_common::errors::Result;
use reviewer_finder_common::models::{ExtractedTopics, ManuscriptQuery};
use reviewer_finder_common::text;
use std::collections::HashMap;

const MIN_WORD_LEN: usize = 3;
const MAX_DOMAINS: usize = 4;
const MAX_METHODOLOGIES: usize = 3;
const MAX_SUB_TOPICS: usize = 5;
const MAX_EXPANDED_TERMS: usize = 8;
const MAX_BRIDGES: usize = 2;

const DEFAULT_DOMAIN: &str = "general science";
const DEFAULT_METHODOLOGY: &str = "empirical study";

type PatternTable = &'static [(&'static str, &'static [&'static str])];

const DOMAIN_PATTERNS: PatternTable = &[
    ("machine learning", &["machine learning", "deep learning", "neural network", "supervised", "unsupervised", "reinforcement learning", "classification", "regression"]),
    ("natural language processing", &["natural language", "nlp", "text mining", "language model", "sentiment", "named entity", "parsing", "translation", "tokeniz"]),
    ("computer vision", &["computer vision", "image recognition", "object detection", "segmentation", "convolutional", "visual", "image classification"]),
    ("genomics", &["genome", "genomic", "dna", "rna", "sequencing", "gene expression", "transcriptom", "epigenom"]),
    ("neuroscience", &["neuroscience", "neural", "brain", "cognitive", "fmri", "eeg", "neuroimaging", "synaptic"]),
    ("climate science", &["climate", "global warming", "greenhouse", "carbon", "atmospheric", "temperature anomal"]),
    ("public health", &["epidemiol", "public health", "pandemic", "vaccine", "mortality", "morbidity", "disease surveillance"]),
    ("materials science", &["materials science", "nanostructur", "polymer", "alloy", "crystallin", "thin film"]),
    ("quantum computing", &["quantum comput", "qubit", "quantum circuit", "quantum entangle", "superposition"]),
    ("astrophysics", &["astrophysic", "stellar", "galaxy", "cosmolog", "exoplanet", "dark matter", "gravitational"]),
    ("renewable energy", &["solar cell", "wind energy", "renewable", "photovoltaic", "energy storage", "battery"]),
    ("economics", &["economic", "market", "inflation", "monetary", "fiscal", "behavioral economics"]),
    ("chemistry", &["chemical", "molecular", "synthesis", "catalyst", "organic chemistry", "reaction mechanism"]),
    ("robotics", &["robot", "autonomous", "manipulation", "motion planning", "swarm", "human-robot"]),
    ("cybersecurity", &["security", "cryptograph", "malware", "intrusion detection", "vulnerability", "encryption"]),
    ("bioinformatics", &["bioinformatic", "protein structure", "sequence alignment", "phylogenet", "protein folding"]),
    ("statistics", &["statistical", "bayesian", "regression", "hypothesis test", "probability", "stochastic"]),
    ("medicine", &["clinical", "patient", "treatment", "diagnosis", "therapeutic", "randomized trial", "placebo"]),
];

const METHOD_PATTERNS: PatternTable = &[
    ("deep learning", &["deep learning", "neural network", "cnn", "rnn", "lstm", "transformer", "attention mechanism", "backpropagation"]),
    ("statistical analysis", &["statistical", "regression", "anova", "chi-square", "t-test", "confidence interval", "p-value"]),
    ("randomized controlled trial", &["randomized", "controlled trial", "rct", "placebo", "double-blind"]),
    ("survey methodology", &["survey", "questionnaire", "likert", "respondent"]),
    ("simulation", &["simulation", "monte carlo", "agent-based", "finite element"]),
    ("qualitative analysis", &["qualitative", "interview", "thematic analysis", "grounded theory"]),
    ("meta-analysis", &["meta-analysis", "systematic review", "effect size", "heterogeneity"]),
    ("experimental", &["experiment", "laboratory", "controlled experiment", "in vitro", "in vivo"]),
    ("computational modeling", &["computational model", "numerical", "differential equation", "optimization"]),
    ("transfer learning", &["transfer learning", "fine-tun", "pre-train", "domain adaptation"]),
];

/// Domain pairs that indicate a known interdisciplinary field
const BRIDGES: &[(&str, &str, &str)] = &[
    ("machine learning", "medicine", "medical AI"),
    ("machine learning", "genomics", "computational genomics"),
    ("machine learning", "materials science", "materials informatics"),
    ("statistics", "genomics", "statistical genetics"),
    ("neuroscience", "machine learning", "computational neuroscience"),
    ("economics", "machine learning", "computational economics"),
    ("chemistry", "machine learning", "cheminformatics"),
    ("climate science", "statistics", "climate modeling"),
    ("robotics", "machine learning", "intelligent robotics"),
];

#[derive(Debug, Default, Clone)]
pub struct HeuristicTopicExtractor;

impl HeuristicTopicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous extraction; never fails
    pub fn extract_sync(&self, query: &ManuscriptQuery) -> ExtractedTopics {
        let lowered = format!("{} {}", query.title, query.abstract_text).to_lowercase();
        let words: Vec<String> = text::words(&lowered)
            .into_iter()
            .filter(|w| w.len() >= MIN_WORD_LEN)
            .collect();

        let top_words = rank_by_frequency(words.iter().filter(|w| !text::is_stopword(w)).cloned());
        let top_bigrams = rank_by_frequency(
            words
                .windows(2)
                .filter(|pair| !text::is_stopword(&pair[0]) && !text::is_stopword(&pair[1]))
                .map(|pair| format!("{} {}", pair[0], pair[1])),
        );

        let domains = match_patterns(&lowered, DOMAIN_PATTERNS);
        let methodologies = match_patterns(&lowered, METHOD_PATTERNS);

        let sub_topics: Vec<String> = query
            .clean_keywords()
            .into_iter()
            .take(MAX_SUB_TOPICS)
            .map(|k| k.to_lowercase())
            .chain(top_bigrams.into_iter().take(MAX_SUB_TOPICS))
            .collect();

        let domain_heads: Vec<&str> = domains
            .iter()
            .filter_map(|d| d.split_whitespace().last())
            .collect();
        let expanded_terms: Vec<String> = top_words
            .into_iter()
            .take(MAX_EXPANDED_TERMS)
            .filter(|w| !domain_heads.contains(&w.as_str()))
            .collect();

        let interdisciplinary_bridges = detect_bridges(&domains);

        let primary_domains = if domains.is_empty() {
            vec![DEFAULT_DOMAIN.to_string()]
        } else {
            domains.into_iter().take(MAX_DOMAINS).collect()
        };
        let methodologies = if methodologies.is_empty() {
            vec![DEFAULT_METHODOLOGY.to_string()]
        } else {
            methodologies.into_iter().take(MAX_METHODOLOGIES).collect()
        };

        let mut topics = ExtractedTopics {
            primary_domains,
            methodologies,
            sub_topics,
            expanded_terms,
            interdisciplinary_bridges,
        }
        .normalized();
        topics.sub_topics.truncate(MAX_SUB_TOPICS);
        topics
    }
}

/// Distinct items, most frequent first; ties keep first-seen order
fn rank_by_frequency(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    for item in items {
        let count = counts.entry(item.clone()).or_insert(0);
        if *count == 0 {
            order.push(item);
        }
        *count += 1;
    }
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
}

/// Table entries with at least one pattern found in `text`, best match first
fn match_patterns(text: &str, table: PatternTable) -> Vec<String> {
    let mut scored: Vec<(&str, usize)> = table
        .iter()
        .map(|(name, patterns)| (*name, patterns.iter().filter(|p| text.contains(**p)).count()))
        .filter(|(_, score)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(name, _)| name.to_string()).collect()
}

fn detect_bridges(domains: &[String]) -> Vec<String> {
    let has = |d: &str| domains.iter().any(|x| x == d);
    BRIDGES
        .iter()
        .filter(|(a, b, _)| has(a) && has(b))
        .map(|(_, _, bridge)| bridge.to_string())
        .take(MAX_BRIDGES)
        .collect()
}

#[async_trait::async_trait]
impl TopicExtractor for HeuristicTopicExtractor {
    async fn extract(&self, query: &ManuscriptQuery) -> Result<ExtractedTopics> {
        Ok(self.extract_sync(query))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
