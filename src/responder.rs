use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::knowledge::{KnowledgeBase, QuizQuestion};

/// Reply returned when nothing in the knowledge base matches.
pub const FALLBACK_REPLY: &str = "I'm not sure about that. Could you please rephrase your question or ask about psychology topics?";

/// Keywords that route an otherwise unmatched utterance to a general
/// explanation.
const TOPIC_KEYWORDS: [&str; 7] = [
    "psychology",
    "psychologist",
    "mental",
    "behavior",
    "therapy",
    "cognitive",
    "behavioral",
];

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(1000);

/// A composed reply plus the simulated latency to wait before showing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub delay: Duration,
}

/// Composes canned replies by scanning the knowledge base.
///
/// Matching is synchronous and never fails. The random draw among a
/// matched pool is the only nondeterminism; tests pin it with a seed.
pub struct Responder {
    kb: KnowledgeBase,
    rng: StdRng,
    reply_delay: Duration,
    fallback_delay: Duration,
}

impl Responder {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self::with_rng(kb, StdRng::from_entropy())
    }

    /// Deterministic responder. Only tests construct one; production code
    /// goes through [`Responder::new`].
    #[allow(dead_code)]
    pub fn with_seed(kb: KnowledgeBase, seed: u64) -> Self {
        Self::with_rng(kb, StdRng::seed_from_u64(seed))
    }

    fn with_rng(kb: KnowledgeBase, rng: StdRng) -> Self {
        Self {
            kb,
            rng,
            reply_delay: DEFAULT_REPLY_DELAY,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
        }
    }

    /// Override the simulated latencies.
    pub fn with_delays(mut self, reply: Duration, fallback: Duration) -> Self {
        self.reply_delay = reply;
        self.fallback_delay = fallback;
        self
    }

    /// Compose the reply for a user utterance.
    ///
    /// The qna entries are scanned in order and the first whose pattern
    /// occurs in the lowercased utterance wins; failing that, a topic
    /// keyword selects a random explanation; failing that, the fixed
    /// fallback. Knowledge base replies carry the short delay, the
    /// fallback the long one.
    pub fn compose(&mut self, utterance: &str) -> Reply {
        let normalized = utterance.trim().to_lowercase();

        if let Some(entry) = self
            .kb
            .qna
            .iter()
            .find(|entry| entry.patterns.iter().any(|p| normalized.contains(&p.to_lowercase())))
        {
            // A matched entry with an empty pool falls through to the
            // fallback, not to the keyword scan.
            return match pick_uniform(&mut self.rng, &entry.responses) {
                Some(text) => Reply {
                    text,
                    delay: self.reply_delay,
                },
                None => self.fallback(),
            };
        }

        if TOPIC_KEYWORDS.iter().any(|keyword| normalized.contains(keyword)) {
            if let Some(text) = pick_uniform(&mut self.rng, &self.kb.explanation) {
                return Reply {
                    text,
                    delay: self.reply_delay,
                };
            }
        }

        self.fallback()
    }

    /// Draw a random quiz question, if the dataset has any.
    pub fn quiz_question(&mut self) -> Option<QuizQuestion> {
        if self.kb.quiz.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.kb.quiz.len());
        self.kb.quiz.get(index).cloned()
    }

    fn fallback(&self) -> Reply {
        Reply {
            text: FALLBACK_REPLY.to_string(),
            delay: self.fallback_delay,
        }
    }
}

fn pick_uniform(rng: &mut StdRng, pool: &[String]) -> Option<String> {
    if pool.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..pool.len());
    pool.get(index).cloned()
}
