use super::stream::ElementaryStream;
use crate::config;
use std::cmp::Ordering;

/// Comparison used by [`ElementarySet::sort_streams`](super::ElementarySet::sort_streams).
///
/// Closures of the right shape implement it directly.
pub trait SortPolicy: Send + Sync {
    fn compare(&self, a: &ElementaryStream, b: &ElementaryStream) -> Ordering;
}

impl<F> SortPolicy for F
where
    F: Fn(&ElementaryStream, &ElementaryStream) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &ElementaryStream, b: &ElementaryStream) -> Ordering {
        self(a, b)
    }
}

/// Class rank first (video, audio, subtitle, teletext, data, signalling,
/// other), then language preference for audio and subtitle classes, then
/// creation position.
#[derive(Debug, Clone, Default)]
pub struct DefaultSortPolicy {
    languages: Vec<String>,
}

impl DefaultSortPolicy {
    pub fn new(languages: Vec<String>) -> Self {
        Self {
            languages: languages
                .into_iter()
                .map(|l| l.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Uses the preferred languages from the global configuration.
    pub fn from_config() -> Self {
        Self::new(config::get_preferred_languages())
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    // Unlisted or missing languages rank after every preferred one.
    fn language_rank(&self, es: &ElementaryStream) -> usize {
        es.lang
            .as_deref()
            .and_then(|lang| self.languages.iter().position(|l| l == lang))
            .unwrap_or(self.languages.len())
    }
}

impl SortPolicy for DefaultSortPolicy {
    fn compare(&self, a: &ElementaryStream, b: &ElementaryStream) -> Ordering {
        let (ca, cb) = (a.class(), b.class());
        ca.rank()
            .cmp(&cb.rank())
            .then_with(|| {
                if ca == cb && ca.is_language_sensitive() {
                    self.language_rank(a).cmp(&self.language_rank(b))
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| a.position().cmp(&b.position()))
    }
}
