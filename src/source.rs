//! Supplying windows of source text for the virus to crawl over
use crate::consts;
use rand::Rng;
use ratatui::layout::Size;
use std::path::PathBuf;
use thiserror::Error;

/// Something that hands out a fresh block of text each time a board is built
pub(crate) trait SourceProvider {
    /// Return a block of text suitable for a board of the given size.  The
    /// first line may be a `// source: <path>` marker naming where the text
    /// came from.
    fn next_source(&mut self, size: Size) -> String;
}

/// A provider that returns the same text every time
#[cfg(test)]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct StaticSource(pub(crate) String);

#[cfg(test)]
impl SourceProvider for StaticSource {
    fn next_source(&mut self, _size: Size) -> String {
        self.0.clone()
    }
}

/// A single file of the corpus
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CorpusEntry {
    pub(crate) path: String,
    pub(crate) content: String,
}

impl CorpusEntry {
    pub(crate) fn new<P: Into<String>, C: Into<String>>(path: P, content: C) -> CorpusEntry {
        CorpusEntry {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Source files compiled into the binary, used when no corpus is configured
static BUILTIN_CORPUS: &[(&str, &str)] = &[
    ("src/grid.rs", include_str!("grid.rs")),
    ("src/highlight.rs", include_str!("highlight.rs")),
    ("src/source.rs", include_str!("source.rs")),
    ("src/game/mod.rs", include_str!("game/mod.rs")),
    ("src/game/targets.rs", include_str!("game/targets.rs")),
    ("src/game/hazards.rs", include_str!("game/hazards.rs")),
    ("src/game/state.rs", include_str!("game/state.rs")),
    ("src/net/mod.rs", include_str!("net/mod.rs")),
];

/// Serves random windows of a corpus of source files, each prefixed by a
/// `// source:` marker and a `// region:` line
#[derive(Clone, Debug)]
pub(crate) struct SourceTextProvider<R> {
    corpus: Vec<CorpusEntry>,
    rng: R,
    last_pick: Option<(usize, usize)>,
}

impl<R: Rng> SourceTextProvider<R> {
    pub(crate) fn new(corpus: Vec<CorpusEntry>, rng: R) -> SourceTextProvider<R> {
        SourceTextProvider {
            corpus,
            rng,
            last_pick: None,
        }
    }

    pub(crate) fn builtin(rng: R) -> SourceTextProvider<R> {
        let corpus = BUILTIN_CORPUS
            .iter()
            .map(|&(path, content)| CorpusEntry::new(path, content))
            .collect();
        SourceTextProvider::new(corpus, rng)
    }

    /// Build a provider from files on disk, falling back to the built-in
    /// corpus if `paths` is empty.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any of the files cannot be read.
    pub(crate) fn from_files(
        paths: &[PathBuf],
        rng: R,
    ) -> Result<SourceTextProvider<R>, CorpusError> {
        if paths.is_empty() {
            return Ok(SourceTextProvider::builtin(rng));
        }
        let corpus = paths
            .iter()
            .map(|p| {
                let content = fs_err::read_to_string(p)?;
                Ok(CorpusEntry::new(p.display().to_string(), content))
            })
            .collect::<Result<Vec<_>, CorpusError>>()?;
        Ok(SourceTextProvider::new(corpus, rng))
    }

    /// Choose an entry & a starting line, avoiding an exact repeat of the
    /// previous choice whenever another choice exists
    fn pick(&mut self, body_lines: usize) -> (usize, usize) {
        let max_offset =
            |entry: &CorpusEntry| entry.content.lines().count().saturating_sub(body_lines);
        let mut index = self.rng.random_range(0..self.corpus.len());
        let mut offset = self.rng.random_range(0..=max_offset(&self.corpus[index]));
        if self.last_pick == Some((index, offset)) {
            if self.corpus.len() > 1 {
                index = (index + 1) % self.corpus.len();
                offset = self.rng.random_range(0..=max_offset(&self.corpus[index]));
            } else {
                offset = (offset + 1) % (max_offset(&self.corpus[index]) + 1);
            }
        }
        self.last_pick = Some((index, offset));
        (index, offset)
    }
}

impl<R: Rng> SourceProvider for SourceTextProvider<R> {
    fn next_source(&mut self, size: Size) -> String {
        if self.corpus.is_empty() {
            return String::new();
        }
        let body_lines = usize::from(size.height.saturating_sub(2));
        let (index, offset) = self.pick(body_lines);
        let entry = &self.corpus[index];
        let body = entry
            .content
            .lines()
            .skip(offset)
            .take(body_lines)
            .collect::<Vec<_>>();
        let mut out = format!(
            "{} {}\n// region: lines {}-{}",
            consts::SOURCE_MARKER,
            entry.path,
            offset + 1,
            offset + body.len()
        );
        for line in body {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

/// Return the path named by a leading `// source: <path>` marker line, or
/// [`UNKNOWN_SOURCE_PATH`][consts::UNKNOWN_SOURCE_PATH] if there is none.
pub(crate) fn extract_source_path(text: &str) -> &str {
    text.lines()
        .next()
        .map(str::trim)
        .and_then(|ln| ln.strip_prefix(consts::SOURCE_MARKER))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(consts::UNKNOWN_SOURCE_PATH)
}

#[derive(Debug, Error)]
#[error("failed to read source corpus file")]
pub(crate) struct CorpusError(#[from] std::io::Error);
