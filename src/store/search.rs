//! Linear-scan search over the store: content search and filename search.
//!
//! There is no index. Every query walks the tree, which is fine at personal
//! collection scale (hundreds of files). Searches run concurrently with writes
//! and may miss a file written a moment ago or still report one just deleted.

use std::cmp::Ordering;
use std::fs;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use super::dirs::is_hidden_file;
use super::types::EntryKind;
use super::RecipeStore;

/// Extensions read by content search.
pub const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];
pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 1000;
/// Files larger than this are not opened by content search.
pub const MAX_SCAN_BYTES: u64 = 4 * 1024 * 1024;
const PREVIEW_CHARS: usize = 200;
const ELLIPSIS: &str = "...";

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOutcome<T> {
    pub query: String,
    pub results: Vec<T>,
    pub total: usize,
    pub duration_ms: u64,
}

/// Char offsets into a snippet, end exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchHit {
    Phrase { text: String, position: usize },
    Word { text: String, count: usize },
    Title { text: String },
    Filename { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentMatch {
    pub path: String,
    pub title: String,
    pub snippet: String,
    pub match_positions: Vec<MatchSpan>,
    pub score: u32,
    pub matches: Vec<MatchHit>,
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMatch {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub score: u32,
}

struct Candidate {
    logical: String,
    name: String,
    abs: PathBuf,
    size: u64,
    modified: SystemTime,
}

fn has_text_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
        .unwrap_or(false)
}

/// Lowercased query words of two chars or more, deduplicated in order.
pub fn query_words(query_lower: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in WORD_RE.find_iter(query_lower) {
        let w = m.as_str();
        if w.chars().count() >= 2 && !out.iter().any(|o| o == w) {
            out.push(w.to_string());
        }
    }
    out
}

/// First `# ` heading of a markdown document.
pub fn extract_title(content: &str) -> Option<&str> {
    content
        .lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix("# ").map(str::trim))
}

/// Per-char lowercase keeping one char per input char, so offsets line up.
fn lower_chars(chars: &[char]) -> Vec<char> {
    chars.iter().map(|c| c.to_lowercase().next().unwrap_or(*c)).collect()
}

fn find_chars(hay: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()] == *needle)
}

fn merge_spans(mut spans: Vec<MatchSpan>) -> Vec<MatchSpan> {
    spans.sort_by_key(|s| (s.start, s.end));
    let mut out: Vec<MatchSpan> = Vec::with_capacity(spans.len());
    for s in spans {
        match out.last_mut() {
            Some(last) if s.start <= last.end => last.end = last.end.max(s.end),
            _ => out.push(s),
        }
    }
    out
}

/// Window of `max_chars` around the first word hit, with `...` where clipped
/// and spans marking every word occurrence inside the returned text.
pub fn build_snippet(content: &str, words: &[String], max_chars: usize) -> (String, Vec<MatchSpan>) {
    let chars: Vec<char> = content.trim().chars().collect();
    let lower = lower_chars(&chars);
    let needles: Vec<Vec<char>> = words.iter().map(|w| w.chars().collect()).collect();

    let first = needles.iter().filter_map(|n| find_chars(&lower, n, 0)).min();
    let start = first.map(|f| f.saturating_sub(max_chars / 3)).unwrap_or(0);
    let end = (start + max_chars).min(chars.len());

    let mut snippet = String::new();
    let offset = if start > 0 {
        snippet.push_str(ELLIPSIS);
        ELLIPSIS.len()
    } else {
        0
    };
    snippet.extend(&chars[start..end]);
    if end < chars.len() {
        snippet.push_str(ELLIPSIS);
    }

    let window = &lower[start..end];
    let mut spans = Vec::new();
    for n in &needles {
        let mut from = 0;
        while let Some(i) = find_chars(window, n, from) {
            spans.push(MatchSpan { start: offset + i, end: offset + i + n.len() });
            from = i + n.len();
        }
    }
    (snippet, merge_spans(spans))
}

/// Relevance of one document:
/// phrase +10, each word occurrence +2, title contains query +15, name contains query +8.
pub fn score_content(query: &str, words: &[String], content: &str, name: &str) -> (u32, Vec<MatchHit>) {
    let query_lower = query.to_lowercase();
    let content_lower = content.to_lowercase();
    let mut score = 0u32;
    let mut hits = Vec::new();

    if let Some(pos) = find_chars(&lower_chars(&content.chars().collect::<Vec<_>>()), &query_lower.chars().collect::<Vec<_>>(), 0) {
        score += 10;
        hits.push(MatchHit::Phrase { text: query.to_string(), position: pos });
    }
    for w in words {
        let count = content_lower.matches(w.as_str()).count();
        if count > 0 {
            score = score.saturating_add((count as u32).saturating_mul(2));
            hits.push(MatchHit::Word { text: w.clone(), count });
        }
    }
    if let Some(title) = extract_title(content) {
        if title.to_lowercase().contains(&query_lower) {
            score += 15;
            hits.push(MatchHit::Title { text: title.to_string() });
        }
    }
    if name.to_lowercase().contains(&query_lower) {
        score += 8;
        hits.push(MatchHit::Filename { text: name.to_string() });
    }
    (score, hits)
}

/// Filename relevance: exact 100, prefix 50, contains 25, else a fuzzy score
/// when at least 70% of the query's chars occur in the name.
pub fn score_filename(query_lower: &str, name_lower: &str) -> u32 {
    if query_lower.is_empty() {
        return 0;
    }
    if query_lower == name_lower {
        return 100;
    }
    if name_lower.starts_with(query_lower) {
        return 50;
    }
    if name_lower.contains(query_lower) {
        return 25;
    }
    let total = query_lower.chars().count();
    let matched = query_lower.chars().filter(|c| name_lower.contains(*c)).count();
    if matched * 10 >= total * 7 {
        (matched as u32) * 2
    } else {
        0
    }
}

/// A limit of 0 asks for nothing; anything above `MAX_LIMIT` is capped.
fn clamp_limit(limit: usize) -> usize {
    limit.min(MAX_LIMIT)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl RecipeStore {
    /// Every visible file below the root. Walk errors and non UTF-8 names are skipped.
    fn walk_files(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        for ent in WalkDir::new(&self.root).min_depth(1).follow_links(false) {
            let ent = match ent {
                Ok(e) => e,
                Err(e) => {
                    debug!(target: "search", error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !ent.file_type().is_file() {
                continue;
            }
            let Some(name) = ent.file_name().to_str() else { continue };
            if is_hidden_file(name) {
                continue;
            }
            let Ok(rel) = ent.path().strip_prefix(&self.root) else { continue };
            let segs: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
            let Some(segs) = segs else { continue };
            let Ok(meta) = ent.metadata() else { continue };
            out.push(Candidate {
                logical: segs.join("/"),
                name: name.to_string(),
                abs: ent.path().to_path_buf(),
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        out
    }

    /// Case-insensitive search over text file contents, ranked by score, then
    /// most recently modified, then path.
    pub fn search_content(&self, query: &str, limit: usize) -> SearchOutcome<ContentMatch> {
        let started = Instant::now();
        let query = query.trim();
        if query.chars().count() < 2 {
            return SearchOutcome { query: query.to_string(), results: Vec::new(), total: 0, duration_ms: 0 };
        }
        let words = query_words(&query.to_lowercase());

        let mut ranked: Vec<(ContentMatch, SystemTime)> = Vec::new();
        for cand in self.walk_files() {
            if !has_text_extension(&cand.name) || cand.size > MAX_SCAN_BYTES {
                continue;
            }
            let Ok(content) = fs::read_to_string(&cand.abs) else { continue };
            let (score, matches) = score_content(query, &words, &content, &cand.name);
            if score == 0 {
                continue;
            }
            let (snippet, match_positions) = build_snippet(&content, &words, PREVIEW_CHARS);
            let title = extract_title(&content).map(str::to_string).unwrap_or_else(|| cand.name.clone());
            let modified: DateTime<Utc> = cand.modified.into();
            ranked.push((
                ContentMatch {
                    path: cand.logical,
                    title,
                    snippet,
                    match_positions,
                    score,
                    matches,
                    last_modified: modified.to_rfc3339_opts(SecondsFormat::Millis, true),
                },
                cand.modified,
            ));
        }
        ranked.sort_by(|(a, am), (b, bm)| {
            b.score.cmp(&a.score).then_with(|| bm.cmp(am)).then_with(|| a.path.cmp(&b.path))
        });
        ranked.truncate(clamp_limit(limit));
        let results: Vec<ContentMatch> = ranked.into_iter().map(|(m, _)| m).collect();
        let total = results.len();
        let duration_ms = elapsed_ms(started);
        debug!(target: "search", query = %query, total, duration_ms, "content search");
        SearchOutcome { query: query.to_string(), results, total, duration_ms }
    }

    /// Search file names (and, weakly, paths). No file contents are read.
    pub fn search_files(&self, query: &str, limit: usize) -> SearchOutcome<FileMatch> {
        let started = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome { query: String::new(), results: Vec::new(), total: 0, duration_ms: 0 };
        }
        let query_lower = query.to_lowercase();

        let mut results: Vec<FileMatch> = self
            .walk_files()
            .into_iter()
            .filter_map(|cand| {
                let mut score = score_filename(&query_lower, &cand.name.to_lowercase());
                if score == 0 && cand.logical.to_lowercase().contains(&query_lower) {
                    score = 10;
                }
                (score > 0).then(|| FileMatch { path: cand.logical, name: cand.name, kind: EntryKind::File, score })
            })
            .collect();
        results.sort_by(|a, b| match b.score.cmp(&a.score) {
            Ordering::Equal => a.path.cmp(&b.path),
            other => other,
        });
        results.truncate(clamp_limit(limit));
        let total = results.len();
        let duration_ms = elapsed_ms(started);
        debug!(target: "search", query = %query, total, duration_ms, "file search");
        SearchOutcome { query: query.to_string(), results, total, duration_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> (tempfile::TempDir, RecipeStore) {
        let tmp = tempdir().unwrap();
        let store = RecipeStore::open(tmp.path()).unwrap();
        store.write("desserts/cake.md", "Ingredients: flour", None).unwrap();
        store.write("mains/stew.md", "# Beef Stew\n\nSlow cooked beef with carrots.", None).unwrap();
        store.write("mains/chocolate-chili.md", "# Chili\n\nA square of chocolate, beef and beans.", None).unwrap();
        (tmp, store)
    }

    #[test]
    fn unique_substring_finds_exactly_one_file() {
        let (_tmp, store) = seeded();
        let out = store.search_content("flour", DEFAULT_LIMIT);
        assert_eq!(out.total, 1);
        assert_eq!(out.results[0].path, "desserts/cake.md");
        assert_eq!(out.results[0].title, "cake.md");
        let span = out.results[0].match_positions[0];
        let marked: String = out.results[0].snippet.chars().skip(span.start).take(span.end - span.start).collect();
        assert_eq!(marked, "flour");
    }

    #[test]
    fn no_match_is_empty() {
        let (_tmp, store) = seeded();
        let out = store.search_content("saffron", DEFAULT_LIMIT);
        assert_eq!(out.total, 0);
        assert!(out.results.is_empty());
        assert_eq!(store.search_content("x", DEFAULT_LIMIT).total, 0);
    }

    #[test]
    fn ranking_prefers_more_matches() {
        let (_tmp, store) = seeded();
        let out = store.search_content("beef", DEFAULT_LIMIT);
        assert_eq!(out.total, 2);
        // Title + phrase + two word hits beat a single body mention.
        assert_eq!(out.results[0].path, "mains/stew.md");
        assert_eq!(out.results[0].title, "Beef Stew");
        assert_eq!(store.search_content("beef", 1).results.len(), 1);
    }

    #[test]
    fn content_search_skips_non_text_files() {
        let (_tmp, store) = seeded();
        fs::write(store.root().join("notes.bin"), "flour").unwrap();
        fs::write(store.root().join("list.txt"), "more flour").unwrap();
        let paths: Vec<_> = store.search_content("flour", 10).results.into_iter().map(|r| r.path).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&"list.txt".to_string()));
    }

    #[test]
    fn filename_search_scores() {
        let (_tmp, store) = seeded();
        let out = store.search_files("chocolate", DEFAULT_LIMIT);
        assert_eq!(out.results[0].name, "chocolate-chili.md");
        assert_eq!(out.results[0].score, 50);
        assert_eq!(store.search_files("  ", DEFAULT_LIMIT).total, 0);
        let by_dir = store.search_files("desserts", DEFAULT_LIMIT);
        assert!(by_dir.results.iter().any(|r| r.path == "desserts/cake.md"));
        assert_eq!(score_filename("cake.md", "cake.md"), 100);
        assert_eq!(score_filename("ake", "cake.md"), 25);
        assert_eq!(score_filename("qqq", "cake.md"), 0);
    }

    #[test]
    fn snippet_clips_with_ellipsis() {
        let body = format!("{}needle{}", "a ".repeat(200), " b".repeat(200));
        let (snip, spans) = build_snippet(&body, &["needle".to_string()], 60);
        assert!(snip.starts_with("..."));
        assert!(snip.ends_with("..."));
        assert_eq!(spans.len(), 1);
        let marked: String = snip.chars().skip(spans[0].start).take(6).collect();
        assert_eq!(marked, "needle");
    }

    #[test]
    fn words_and_titles() {
        assert_eq!(query_words("beef, beef & a stew"), vec!["beef", "stew"]);
        assert_eq!(extract_title("intro\n  # Pancakes  \n## Ingredients"), Some("Pancakes"));
        assert_eq!(extract_title("## Only h2"), None);
    }

    #[test]
    fn equal_scores_rank_newest_first() {
        use std::time::Duration;
        let tmp = tempdir().unwrap();
        let store = RecipeStore::open(tmp.path()).unwrap();
        store.write("a.md", "butter and sugar", None).unwrap();
        store.write("b.md", "butter and sugar", None).unwrap();
        let now = SystemTime::now();
        let set = |name: &str, t: SystemTime| {
            fs::OpenOptions::new().write(true).open(store.root().join(name)).unwrap().set_modified(t).unwrap();
        };
        set("a.md", now - Duration::from_secs(3600));
        set("b.md", now);

        let out = store.search_content("butter", DEFAULT_LIMIT);
        assert_eq!(out.results[0].score, out.results[1].score);
        let paths: Vec<_> = out.results.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["b.md", "a.md"]);

        set("a.md", now + Duration::from_secs(60));
        let paths: Vec<_> = store.search_content("butter", DEFAULT_LIMIT).results.into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["a.md", "b.md"]);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let (_tmp, store) = seeded();
        assert_eq!(store.search_content("flour", 0).total, 0);
        assert_eq!(store.search_files("cake", 0).total, 0);
        assert_eq!(store.search_files("md", MAX_LIMIT + 10).total, 3);
    }
}
