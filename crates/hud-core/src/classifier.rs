//! Pattern-based state classification.
//!
//! Turns a tail of unstructured text (debug-log lines or a captured
//! terminal screen) into a [`ClaudeState`]. Two vocabularies exist, one per
//! evidence source; callers pick the one matching where the text came from.
//!
//! The rule is "most recent evidence wins": lines are scanned newest-first
//! and the class whose first hit is closest to the bottom decides, with two
//! exceptions. Any error pattern preempts everything, and "done" is only
//! honored when no more recent activity superseded it.

use once_cell::sync::Lazy;
use regex::{RegexSet, RegexSetBuilder};
use tracing::{error, trace};

use crate::ClaudeState;

/// Number of trailing lines considered.
pub const RECENT_LINES: usize = 50;

/// A working hit only counts if it is within this many lines of the bottom.
pub const WORKING_RECENCY: usize = 10;

/// Regex sources for one evidence source, grouped by state class.
#[derive(Debug, Clone, Copy)]
pub struct PatternSources {
    pub error: &'static [&'static str],
    pub waiting: &'static [&'static str],
    pub working: &'static [&'static str],
    pub done: &'static [&'static str],
    pub prompt: &'static [&'static str],
}

/// Agent debug log (`~/.claude/debug/<session>.txt`).
pub const LOG_SOURCES: PatternSources = PatternSources {
    error: &[r"\[error\]", r"error:"],
    waiting: &[r"permission_prompt", r"getinput"],
    working: &[
        r"stream started",
        r"executepretoolhooks",
        r"\[api:request\]",
        r"executing tool",
    ],
    done: &[r"stream completed", r"task completed"],
    prompt: &[],
};

/// Visible terminal screen of the agent's TUI.
pub const SCREEN_SOURCES: PatternSources = PatternSources {
    error: &[r"\[error\]", r"error:", r"failed", r"exception"],
    waiting: &[
        r"do you want to proceed",
        r"yes, and always allow",
        r"\? allow",
        r"esc to cancel",
        r"tab to add additional",
        r"1\. yes",
        r"2\. yes, and",
        r"3\. no",
    ],
    working: &[
        r"ctrl\+c to interrupt",
        r"tokens\)",
        r"running",
        r"● ",
        r"waiting…",
        r"explore\(",
        r"task\(",
        r"bash\(",
        r"read\(",
        r"write\(",
        r"edit\(",
        r"glob\(",
        r"grep\(",
        r"webfetch\(",
        r"websearch\(",
        r"let me",
        r"i'll ",
        r"i will",
        r"\+\d+ more tool",
        r"ctrl\+o to expand",
    ],
    done: &[r"✓", r"✔", r"completed", r"done!"],
    prompt: &[r"❯", r"> "],
};

/// Compiled, immutable vocabulary for one evidence source.
#[derive(Debug)]
pub struct PatternSet {
    name: &'static str,
    error: RegexSet,
    waiting: RegexSet,
    working: RegexSet,
    done: RegexSet,
    prompt: RegexSet,
}

/// Vocabulary for debug-log tails.
pub static LOG_PATTERNS: Lazy<PatternSet> = Lazy::new(|| PatternSet::compile("log", &LOG_SOURCES));

/// Vocabulary for captured screen buffers.
pub static SCREEN_PATTERNS: Lazy<PatternSet> =
    Lazy::new(|| PatternSet::compile("screen", &SCREEN_SOURCES));

impl PatternSet {
    /// Compiles a vocabulary. All patterns are case-insensitive.
    ///
    /// A class whose patterns fail to compile is logged and left empty,
    /// so it never matches.
    pub fn compile(name: &'static str, sources: &PatternSources) -> Self {
        Self {
            name,
            error: compile_class(name, "error", sources.error),
            waiting: compile_class(name, "waiting", sources.waiting),
            working: compile_class(name, "working", sources.working),
            done: compile_class(name, "done", sources.done),
            prompt: compile_class(name, "prompt", sources.prompt),
        }
    }

    /// Returns the vocabulary name ("log" or "screen").
    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn compile_class(set: &str, class: &str, patterns: &[&str]) -> RegexSet {
    match RegexSetBuilder::new(patterns).case_insensitive(true).build() {
        Ok(compiled) => compiled,
        Err(e) => {
            error!(set, class, error = %e, "Invalid classifier pattern, class disabled");
            RegexSet::empty()
        }
    }
}

/// Index (0 = most recent) of the first line matching `set`.
fn first_match(set: &RegexSet, newest_first: &[String]) -> Option<usize> {
    newest_first.iter().position(|line| set.is_match(line))
}

/// Classifies a tail of lines, newest last.
pub fn classify<S: AsRef<str>>(lines: &[S], patterns: &PatternSet) -> ClaudeState {
    let newest_first: Vec<String> = lines
        .iter()
        .rev()
        .take(RECENT_LINES)
        .map(|line| line.as_ref().to_lowercase())
        .collect();

    if newest_first.is_empty() {
        return ClaudeState::Idle;
    }

    let buffer = newest_first.join("\n");
    if patterns.error.is_match(&buffer) {
        trace!(vocabulary = patterns.name, "error pattern present");
        return ClaudeState::Error;
    }

    let waiting = first_match(&patterns.waiting, &newest_first);
    let working = first_match(&patterns.working, &newest_first);
    let done = first_match(&patterns.done, &newest_first);

    trace!(
        vocabulary = patterns.name,
        ?waiting,
        ?working,
        ?done,
        "pattern positions"
    );

    // None sorts after every index: "not found" is infinitely distant.
    let before = |a: usize, b: Option<usize>| b.map_or(true, |b| a < b);

    if let Some(w) = waiting {
        if before(w, working) {
            return ClaudeState::WaitingInput;
        }
    }

    if let Some(d) = done {
        if before(d, working) && before(d, waiting) {
            return ClaudeState::Done;
        }
    }

    if matches!(working, Some(k) if k < WORKING_RECENCY) {
        return ClaudeState::Working;
    }

    if patterns.prompt.is_match(&buffer) {
        trace!(vocabulary = patterns.name, "bare prompt");
    }

    ClaudeState::Idle
}

/// Classifies a block of text by splitting it into lines.
pub fn classify_text(text: &str, patterns: &PatternSet) -> ClaudeState {
    let lines: Vec<&str> = text.lines().collect();
    classify(&lines, patterns)
}
