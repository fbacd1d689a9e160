use common::full_text::Term;

/// Matching semantics for full-text search.
///
/// Implementors only need to split text into tokens; term evaluation and scoring are
/// provided on top of the token sequence.
pub trait Analyzer: Send + Sync {
    /// Splits `text` into the tokens terms are matched against.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// True if `term` matches the token sequence.
    fn term_matches(&self, term: &Term, tokens: &[String]) -> bool {
        match term {
            Term::Simple { value, negated } => {
                let phrase = self.tokenize(value);
                let found = !phrase.is_empty()
                    && phrase.len() <= tokens.len()
                    && tokens.windows(phrase.len()).any(|w| w == phrase.as_slice());
                found != *negated
            }
            Term::Conjunction(terms) => terms.iter().all(|t| self.term_matches(t, tokens)),
            Term::Disjunction(terms) => terms.iter().any(|t| self.term_matches(t, tokens)),
        }
    }

    /// True if `term` matches `text`.
    fn matches(&self, term: &Term, text: &str) -> bool {
        self.term_matches(term, &self.tokenize(text))
    }

    /// Relevance of `text` for `term`: the share of non-negated terms it contains, or 0
    /// if the term does not match.
    fn score(&self, term: &Term, text: &str) -> f64 {
        let tokens = self.tokenize(text);
        if !self.term_matches(term, &tokens) {
            return 0.0;
        }
        let positive: Vec<&Term> = term
            .simple_terms()
            .into_iter()
            .filter(|t| matches!(t, Term::Simple { negated: false, .. }))
            .collect();
        if positive.is_empty() {
            return 1.0;
        }
        let found = positive
            .iter()
            .filter(|t| self.term_matches(t, &tokens))
            .count();
        found as f64 / positive.len() as f64
    }
}

/// Lower-cases text and splits it on anything that is not alphanumeric.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleAnalyzer;

impl Analyzer for SimpleAnalyzer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }
}
