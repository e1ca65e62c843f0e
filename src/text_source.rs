//! Word lists and quote collections bundled into the binary.

use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::{seq::SliceRandom, Rng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

/// Quote length bucket; selects one of the collection's length groups.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuoteLength {
    Short,
    Medium,
    Long,
    Thicc,
}

impl QuoteLength {
    fn group(self) -> usize {
        match self {
            QuoteLength::Short => 0,
            QuoteLength::Medium => 1,
            QuoteLength::Long => 2,
            QuoteLength::Thicc => 3,
        }
    }
}

pub trait TextSource: Send {
    fn word_list(&self) -> Result<Vec<String>>;

    /// Quotes whose length falls in the bucket's group range.
    fn quotes(&self, length: QuoteLength) -> Result<Vec<String>>;
}

#[derive(Deserialize, Clone, Debug)]
pub struct Language {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Quote {
    pub text: String,
    pub source: String,
    pub id: u32,
    pub length: usize,
}

#[derive(Deserialize, Clone, Debug)]
pub struct QuoteCollection {
    pub groups: Vec<(usize, usize)>,
    pub quotes: Vec<Quote>,
}

impl QuoteCollection {
    pub fn in_bucket(&self, length: QuoteLength) -> impl Iterator<Item = &Quote> + '_ {
        let range = self.groups.get(length.group()).copied();
        self.quotes.iter().filter(move |quote| {
            range.is_some_and(|(lo, hi)| (lo..=hi).contains(&quote.length))
        })
    }
}

/// Text source reading the lists compiled in from `src/lang`.
#[derive(Clone, Debug)]
pub struct EmbeddedTextSource {
    language: String,
}

impl EmbeddedTextSource {
    /// Fails when no word list exists for `language`.
    pub fn new(language: &str) -> Result<Self> {
        let source = Self {
            language: language.to_lowercase(),
        };
        source.language()?;
        Ok(source)
    }

    pub fn language(&self) -> Result<Language> {
        read_json(&format!("{}.json", self.language), "get_word_list")
    }

    pub fn quote_collection(&self) -> Result<QuoteCollection> {
        read_json(&format!("quotes/{}.json", self.language), "get_quotes")
    }
}

impl TextSource for EmbeddedTextSource {
    fn word_list(&self) -> Result<Vec<String>> {
        Ok(self.language()?.words)
    }

    fn quotes(&self, length: QuoteLength) -> Result<Vec<String>> {
        Ok(self
            .quote_collection()?
            .in_bucket(length)
            .map(|quote| quote.text.clone())
            .collect())
    }
}

/// Fixed lists, for tests and custom prompts.
#[derive(Clone, Debug, Default)]
pub struct StaticTextSource {
    pub words: Vec<String>,
    pub quotes: Vec<String>,
}

impl StaticTextSource {
    pub fn new<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            quotes: Vec::new(),
        }
    }
}

impl TextSource for StaticTextSource {
    fn word_list(&self) -> Result<Vec<String>> {
        Ok(self.words.clone())
    }

    fn quotes(&self, _length: QuoteLength) -> Result<Vec<String>> {
        Ok(self.quotes.clone())
    }
}

fn read_json<T: DeserializeOwned>(file_name: &str, operation: &'static str) -> Result<T> {
    let file = LANG_DIR
        .get_file(file_name)
        .ok_or_else(|| Error::ResourceFetch {
            operation,
            status: format!("{file_name} not found"),
        })?;
    let contents = file.contents_utf8().ok_or_else(|| Error::Parse {
        what: file_name.to_string(),
        fragment: "<non-utf8 content>".to_string(),
    })?;
    parse_json(file_name, contents)
}

fn parse_json<T: DeserializeOwned>(what: &str, contents: &str) -> Result<T> {
    serde_json::from_str(contents).map_err(|e| {
        let line = contents.lines().nth(e.line().saturating_sub(1)).unwrap_or("");
        Error::Parse {
            what: what.to_string(),
            fragment: line.trim().to_string(),
        }
    })
}

/// Shuffles `words` and joins at most `count` of them with single spaces.
pub fn build_target<R: Rng + ?Sized>(words: &mut [String], count: usize, rng: &mut R) -> String {
    words.shuffle(rng);
    words
        .iter()
        .take(count)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn pick_quote<R: Rng + ?Sized>(quotes: &[String], rng: &mut R) -> Option<String> {
    quotes.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_embedded_english() {
        let source = EmbeddedTextSource::new("English").unwrap();
        let lang = source.language().unwrap();
        assert_eq!(lang.name, "english");
        assert_eq!(lang.size as usize, lang.words.len());
        assert!(lang.words.iter().all(|w| !w.contains(' ')));
    }

    #[test]
    fn test_unknown_language_is_fetch_error() {
        assert_matches!(
            EmbeddedTextSource::new("klingon"),
            Err(Error::ResourceFetch {
                operation: "get_word_list",
                ..
            })
        );
    }

    #[test]
    fn test_quote_buckets_follow_groups() {
        let source = EmbeddedTextSource::new("english").unwrap();
        let collection = source.quote_collection().unwrap();
        for length in [
            QuoteLength::Short,
            QuoteLength::Medium,
            QuoteLength::Long,
            QuoteLength::Thicc,
        ] {
            let (lo, hi) = collection.groups[length.group()];
            let quotes: Vec<_> = collection.in_bucket(length).collect();
            assert!(!quotes.is_empty(), "no {length} quotes");
            assert!(quotes.iter().all(|q| q.length >= lo && q.length <= hi));
            assert!(quotes.iter().all(|q| q.text.chars().count() == q.length));
        }
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_json::<Language>("broken.json", "{\n  \"name\": \"x\",\n  \"words\": [1, 2]\n}")
            .unwrap_err();
        assert_matches!(err, Error::Parse { what, fragment } if what == "broken.json" && fragment.contains("words"));
    }

    #[test]
    fn test_build_target_limits_and_joins() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut words: Vec<String> = ["a", "b", "c", "d"].map(String::from).to_vec();
        let target = build_target(&mut words, 3, &mut rng);
        assert_eq!(target.split(' ').count(), 3);
        assert!(!target.starts_with(' ') && !target.ends_with(' '));

        let mut one = vec!["cat".to_string()];
        assert_eq!(build_target(&mut one, 10, &mut rng), "cat");
        assert_eq!(build_target(&mut [], 10, &mut rng), "");
    }

    #[test]
    fn test_quote_length_names() {
        assert_eq!(QuoteLength::Thicc.to_string(), "thicc");
        assert_eq!(
            serde_json::from_str::<QuoteLength>("\"medium\"").unwrap(),
            QuoteLength::Medium
        );
    }
}
