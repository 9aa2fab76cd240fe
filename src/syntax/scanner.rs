//! The scan loop
//!
//! A highlight call walks the input with a stack of active modes. At each
//! step the matcher of the innermost mode finds the next begin, end or
//! illegal match; text in between is buffered and flushed through the
//! mode's keywords (or a nested highlight call for sublanguages) whenever
//! the structure changes.
//!
//! The bottom of the stack is always the grammar's root mode and is never
//! popped.

use std::collections::HashMap;

use super::compiler::{CompiledGrammar, CompiledMode, CompiledScope, ModeId, SegmentScope};
use super::emitter::TokenTree;
use super::grammar::SubLanguage;
use super::hooks::{FrameData, MatchDecision, MatchInfo};
use super::matcher::{MatchResult, RuleKind};
use super::registry::Registry;
use super::result::{HighlightResult, IllegalContext};
use crate::config::Config;
use crate::error::{HighlightError, Result};

/// One entry of the mode stack
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub(crate) mode: ModeId,
    pub(crate) data: FrameData,
    /// Relevance already counted by the call that handed this frame on
    pub(crate) credited: bool,
}

impl Frame {
    fn new(mode: ModeId) -> Self {
        Self {
            mode,
            data: FrameData::default(),
            credited: false,
        }
    }
}

/// Kind and offset of the previous match, for the zero-width guard
#[derive(Debug, Clone, Copy)]
struct LastMatch {
    kind: RuleKind,
    index: usize,
}

/// How a highlight call treats faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanOptions {
    /// Illegal matches are ordinary text
    pub(crate) ignore_illegals: bool,
    /// Recover from illegal matches and engine faults with a plain result
    pub(crate) safe_mode: bool,
}

/// Highlight `code` with the registered language `language`
///
/// `continuation` is the mode stack a previous call ended in; the scan
/// resumes inside those modes instead of at the root.
pub(crate) fn highlight(
    registry: &Registry,
    language: &str,
    code: &str,
    options: ScanOptions,
    continuation: Option<Vec<Frame>>,
) -> Result<HighlightResult> {
    let grammar = registry
        .get_language(language)
        .ok_or_else(|| HighlightError::UnknownLanguage(language.to_string()))?;
    let compiled = grammar.compiled()?;
    let config = registry.config();

    let mut scanner = Scanner::new(registry, &compiled, &grammar.name, code, options, config);
    scanner.restore(continuation);

    match scanner.run() {
        Ok(top) => Ok(scanner.into_result(top)),
        Err(HighlightError::IllegalToken(context)) if options.safe_mode => {
            let mut result =
                HighlightResult::plain(Some(grammar.name.clone()), code, &config.class_prefix);
            result.illegal = true;
            result.illegal_by = Some(*context);
            Ok(result)
        }
        Err(err @ HighlightError::EngineFault { .. }) if options.safe_mode => {
            log::warn!("{}", err);
            let mut result =
                HighlightResult::plain(Some(grammar.name.clone()), code, &config.class_prefix);
            result.error_raised = Some(err.to_string());
            result.top = scanner.stack.clone();
            Ok(result)
        }
        Err(err) => Err(err),
    }
}

struct Scanner<'a> {
    registry: &'a Registry,
    grammar: &'a CompiledGrammar,
    language: &'a str,
    code: &'a str,
    options: ScanOptions,
    config: &'a Config,
    stack: Vec<Frame>,
    tree: TokenTree,
    /// Text seen since the last structural event
    buffer: String,
    relevance: u32,
    keyword_hits: HashMap<String, u32>,
    /// Where each fixed sublanguage left off
    continuations: HashMap<String, Vec<Frame>>,
    index: usize,
    iterations: usize,
    last_match: Option<LastMatch>,
    /// First rule to try on the next match; see `ResumableMultiRegex::exec`
    cursor: usize,
    resume: bool,
}

impl<'a> Scanner<'a> {
    fn new(
        registry: &'a Registry,
        grammar: &'a CompiledGrammar,
        language: &'a str,
        code: &'a str,
        options: ScanOptions,
        config: &'a Config,
    ) -> Self {
        Self {
            registry,
            grammar,
            language,
            code,
            options,
            config,
            stack: vec![Frame::new(grammar.root())],
            tree: TokenTree::new(),
            buffer: String::new(),
            relevance: 0,
            keyword_hits: HashMap::new(),
            continuations: HashMap::new(),
            index: 0,
            iterations: 0,
            last_match: None,
            cursor: 0,
            resume: false,
        }
    }

    /// Resume inside the modes of an earlier call
    fn restore(&mut self, continuation: Option<Vec<Frame>>) {
        let Some(frames) = continuation else {
            return;
        };
        let valid = frames.first().map(|f| f.mode) == Some(self.grammar.root())
            && frames.iter().all(|f| f.mode < self.grammar.mode_count());
        if !valid {
            return;
        }

        let grammar = self.grammar;
        for frame in &frames[1..] {
            if let Some(scope) = &grammar.mode(frame.mode).scope {
                self.tree.open_node(grammar.scope_name(scope));
            }
        }
        self.stack = frames;
    }

    fn top(&self) -> &'a CompiledMode {
        let grammar = self.grammar;
        let id = self.stack.last().map_or(grammar.root(), |f| f.mode);
        grammar.mode(id)
    }

    /// Scan the whole input; returns the mode stack as it was before the
    /// still-open modes were closed
    fn run(&mut self) -> Result<Vec<Frame>> {
        loop {
            self.iterations += 1;
            if self.resume {
                self.resume = false;
            } else {
                self.cursor = 0;
            }

            let found = self
                .top()
                .matcher
                .exec(self.code, self.index, &mut self.cursor)
                .map_err(|err| self.fault(format!("matcher failed: {}", err), None))?;
            let Some(found) = found else {
                break;
            };

            let before = self.code.get(self.index..found.index).unwrap_or("");
            self.buffer.push_str(before);
            let advance = self.process_lexeme(&found)?;
            self.index = found.index + advance;
            if self.index > self.code.len() {
                break;
            }
        }

        let rest = self.code.get(self.index..).unwrap_or("");
        self.buffer.push_str(rest);
        self.process_buffer()?;

        let mut top = self.stack.clone();
        while self.stack.len() > 1 {
            self.pop_frame();
        }
        self.tree.finalize();
        // A later segment resuming in these frames must not count them again
        for frame in &mut top {
            frame.credited = true;
        }
        Ok(top)
    }

    fn into_result(self, top: Vec<Frame>) -> HighlightResult {
        let mut result = HighlightResult::new(
            Some(self.language.to_string()),
            self.tree,
            &self.config.class_prefix,
        );
        result.relevance = self.relevance;
        result.top = top;
        result
    }

    /// Handle one match; returns how far to advance past its start
    fn process_lexeme(&mut self, found: &MatchResult) -> Result<usize> {
        let lexeme = found.lexeme(self.code);

        if self.iterations > self.config.iteration_floor
            && self.iterations > self.config.iteration_ratio.saturating_mul(found.index)
        {
            return Err(self.fault(
                "potential infinite loop, way more iterations than matches".to_string(),
                None,
            ));
        }

        if let Some(last) = self.last_match {
            let zero_width = matches!(last.kind, RuleKind::Begin(_))
                && found.kind == RuleKind::End
                && last.index == found.index
                && lexeme.is_empty();
            if zero_width {
                // Force progress past a begin and end that both matched
                // nothing at the same offset
                let step = self.take_char(found.index);
                if !self.options.safe_mode {
                    let rule = match last.kind {
                        RuleKind::Begin(id) => Some(self.grammar.mode(id).label.clone()),
                        _ => None,
                    };
                    return Err(self.fault("0 width match regex".to_string(), rule));
                }
                return Ok(step.max(1));
            }
        }
        self.last_match = Some(LastMatch {
            kind: found.kind,
            index: found.index,
        });

        match found.kind {
            RuleKind::Begin(id) => return self.do_begin(id, found),
            RuleKind::Illegal if !self.options.ignore_illegals => {
                return Err(self.illegal(found));
            }
            RuleKind::End => {
                if let Some(advance) = self.do_end(found)? {
                    return Ok(advance);
                }
            }
            RuleKind::Illegal => {}
        }

        if found.kind == RuleKind::Illegal && lexeme.is_empty() {
            return Ok(self.take_char(found.index).max(1));
        }

        self.buffer.push_str(lexeme);
        Ok(lexeme.len())
    }

    fn do_begin(&mut self, id: ModeId, found: &MatchResult) -> Result<usize> {
        let grammar = self.grammar;
        let mode = grammar.mode(id);
        let lexeme = found.lexeme(self.code);

        let info = MatchInfo::new(self.code, found.index, found.groups.clone());
        let mut data = FrameData::default();
        for hook in [&mode.before_begin, &mode.on_begin].into_iter().flatten() {
            if hook.call(&info, &mut data) == MatchDecision::Ignore {
                return Ok(self.do_ignore(found.index));
            }
        }

        if mode.skip {
            self.buffer.push_str(lexeme);
        } else {
            if mode.exclude_begin {
                self.buffer.push_str(lexeme);
            }
            self.process_buffer()?;
            if !mode.return_begin && !mode.exclude_begin {
                self.buffer.push_str(lexeme);
            }
        }
        self.start_new_mode(id, found, data)?;

        Ok(if mode.return_begin { 0 } else { lexeme.len() })
    }

    /// A hook ignored the begin match at `index`
    fn do_ignore(&mut self, index: usize) -> usize {
        if self.cursor == 0 {
            // Every rule was tried here: keep one character as text
            self.take_char(index).max(1)
        } else {
            self.resume = true;
            0
        }
    }

    fn do_end(&mut self, found: &MatchResult) -> Result<Option<usize>> {
        let Some(owner) = self.end_of_mode(found)? else {
            return Ok(None);
        };
        let grammar = self.grammar;
        let lexeme = found.lexeme(self.code);
        let origin = self.top();

        match &origin.end_scope {
            Some(CompiledScope::Wrap(scope)) => {
                self.process_buffer()?;
                self.tree.add_keyword(lexeme, grammar.scope_name(scope));
            }
            Some(CompiledScope::Segments(segments)) => {
                self.process_buffer()?;
                self.emit_segments(segments, found)?;
            }
            None if origin.skip => self.buffer.push_str(lexeme),
            None => {
                if !origin.return_end && !origin.exclude_end {
                    self.buffer.push_str(lexeme);
                }
                self.process_buffer()?;
                if origin.exclude_end {
                    self.buffer.push_str(lexeme);
                }
            }
        }

        let ended = self.stack[owner].mode;
        while self.stack.len() > owner {
            self.pop_frame();
        }
        if let Some(next) = grammar.mode(ended).starts {
            self.start_new_mode(next, found, FrameData::default())?;
        }

        Ok(Some(if origin.return_end { 0 } else { lexeme.len() }))
    }

    /// Depth of the frame an end match closes, walking up through modes
    /// that end with their parent
    fn end_of_mode(&mut self, found: &MatchResult) -> Result<Option<usize>> {
        let grammar = self.grammar;
        let mut depth = self.stack.len() - 1;

        while depth > 0 {
            let mode = grammar.mode(self.stack[depth].mode);
            if let Some(end_re) = &mode.end_re {
                let at_start = end_re
                    .find_from_pos(self.code, found.index)
                    .map_err(|err| self.fault(format!("end pattern failed: {}", err), None))?
                    .map_or(false, |m| m.start() == found.index);

                let accepted = at_start
                    && match &mode.on_end {
                        Some(hook) => {
                            let info = MatchInfo::new(self.code, found.index, found.groups.clone());
                            hook.call(&info, &mut self.stack[depth].data) == MatchDecision::Accept
                        }
                        None => true,
                    };

                if accepted {
                    let mut owner = depth;
                    while owner > 1 && grammar.mode(self.stack[owner].mode).ends_parent {
                        owner -= 1;
                    }
                    return Ok(Some(owner));
                }
            }

            if !mode.ends_with_parent {
                break;
            }
            depth -= 1;
        }
        Ok(None)
    }

    fn start_new_mode(&mut self, id: ModeId, found: &MatchResult, data: FrameData) -> Result<()> {
        let grammar = self.grammar;
        let mode = grammar.mode(id);

        if let Some(scope) = &mode.scope {
            self.tree.open_node(grammar.scope_name(scope));
        }
        match &mode.begin_scope {
            Some(CompiledScope::Wrap(scope)) => {
                let text = std::mem::take(&mut self.buffer);
                self.tree.add_keyword(&text, grammar.scope_name(scope));
            }
            Some(CompiledScope::Segments(segments)) => {
                self.emit_segments(segments, found)?;
                self.buffer.clear();
            }
            None => {}
        }

        self.stack.push(Frame {
            mode: id,
            data,
            credited: false,
        });
        Ok(())
    }

    fn pop_frame(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let grammar = self.grammar;
        let mode = grammar.mode(frame.mode);
        if mode.scope.is_some() {
            self.tree.close_node();
        }
        if !frame.credited && !mode.skip && mode.sub_language.is_none() {
            self.relevance += mode.relevance;
        }
    }

    /// Emit the segments of an array-valued begin or end one by one
    fn emit_segments(&mut self, segments: &[SegmentScope], found: &MatchResult) -> Result<()> {
        let grammar = self.grammar;
        for segment in segments {
            let Some(range) = found.groups.get(segment.group).cloned().flatten() else {
                continue;
            };
            let text = self.code.get(range).unwrap_or("");
            match &segment.scope {
                Some(scope) => self.tree.add_keyword(text, grammar.scope_name(scope)),
                None => self.process_keywords(text)?,
            }
        }
        Ok(())
    }

    /// Flush the buffer through the current mode
    fn process_buffer(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.buffer);
        if self.top().sub_language.is_some() {
            self.process_sublanguage(&text)
        } else {
            self.process_keywords(&text)
        }
    }

    fn process_keywords(&mut self, text: &str) -> Result<()> {
        let grammar = self.grammar;
        let Some(keywords) = &self.top().keywords else {
            self.tree.add_text(text);
            return Ok(());
        };

        let mut last = 0;
        let mut pending = String::new();
        for found in keywords.pattern.find_iter(text) {
            let found =
                found.map_err(|err| self.fault(format!("keyword pattern failed: {}", err), None))?;
            pending.push_str(&text[last..found.start()]);
            last = found.end();

            let word = found.as_str();
            let key = if grammar.case_insensitive() {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            let Some(entry) = keywords.table.get(&key) else {
                pending.push_str(word);
                continue;
            };

            self.tree.add_text(&pending);
            pending.clear();

            let hits = self.keyword_hits.entry(key).or_insert(0);
            *hits += 1;
            if *hits <= self.config.max_keyword_hits {
                self.relevance += entry.relevance;
            }

            if entry.is_hidden() {
                pending.push_str(word);
            } else {
                self.tree.add_keyword(word, grammar.scope_name(&entry.category));
            }
        }
        pending.push_str(&text[last..]);
        self.tree.add_text(&pending);
        Ok(())
    }

    fn process_sublanguage(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mode = self.top();

        let result = match &mode.sub_language {
            Some(SubLanguage::Named(name)) => {
                if self.registry.get_language(name).is_none() {
                    self.registry
                        .warn_once(&format!("sublanguage `{}` is not registered", name));
                    self.tree.add_text(text);
                    return Ok(());
                }
                let continuation = self.continuations.remove(name);
                let options = ScanOptions {
                    ignore_illegals: true,
                    safe_mode: self.options.safe_mode,
                };
                let result = highlight(self.registry, name, text, options, continuation)?;
                self.continuations.insert(name.clone(), result.top.clone());
                result
            }
            Some(SubLanguage::Candidates(candidates)) => {
                let subset = if candidates.is_empty() {
                    None
                } else {
                    Some(candidates.as_slice())
                };
                self.registry.highlight_auto(text, subset)
            }
            None => {
                self.tree.add_text(text);
                return Ok(());
            }
        };

        if mode.relevance > 0 {
            self.relevance += result.relevance;
        }
        self.tree.add_sublanguage(result.tree, result.language.as_deref());
        Ok(())
    }

    /// Move the character at `index` into the buffer; returns its length
    fn take_char(&mut self, index: usize) -> usize {
        let Some(c) = self.code.get(index..).and_then(|rest| rest.chars().next()) else {
            return 0;
        };
        self.buffer.push(c);
        c.len_utf8()
    }

    fn illegal(&self, found: &MatchResult) -> HighlightError {
        let label = &self.top().label;
        let mut so_far = self.tree.clone();
        so_far.finalize();
        HighlightError::IllegalToken(Box::new(IllegalContext {
            message: format!(
                "Illegal lexeme \"{}\" for mode \"{}\"",
                found.lexeme(self.code),
                label
            ),
            index: found.index,
            context: context_window(self.code, found.index, self.config.context_window).to_string(),
            mode: label.clone(),
            language: self.language.to_string(),
            result_so_far: so_far.to_html(&self.config.class_prefix),
        }))
    }

    fn fault(&self, message: String, rule: Option<String>) -> HighlightError {
        HighlightError::EngineFault {
            language: self.language.to_string(),
            message,
            rule,
        }
    }
}

/// Up to `width` bytes of `code` on each side of `index`, widened to
/// character boundaries
fn context_window(code: &str, index: usize, width: usize) -> &str {
    let mut start = index.saturating_sub(width).min(code.len());
    while !code.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = index.saturating_add(width).min(code.len());
    while !code.is_char_boundary(end) {
        end += 1;
    }
    code.get(start..end).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Grammar, Keywords, Mode, Pattern, ScopeSpec};

    fn registry_with(grammars: Vec<Grammar>) -> Registry {
        let mut registry = Registry::new();
        for grammar in grammars {
            registry.register_grammar(grammar).unwrap();
        }
        registry
    }

    fn run(registry: &Registry, language: &str, code: &str) -> HighlightResult {
        let options = ScanOptions {
            ignore_illegals: true,
            safe_mode: false,
        };
        highlight(registry, language, code, options, None).unwrap()
    }

    fn string_mode() -> Mode {
        Mode::new().scope("string").begin("\"").end("\"").illegal(r"\n")
    }

    #[test]
    fn test_keywords_only() {
        let registry = registry_with(vec![Grammar::new(
            "greet",
            Mode::new().keywords(Keywords::words("hello")),
        )]);
        let result = run(&registry, "greet", "hello world");
        assert_eq!(
            result.value,
            "<span class=\"hljs-keyword\">hello</span> world"
        );
        assert_eq!(result.relevance, 1);
        assert!(!result.illegal);
    }

    #[test]
    fn test_relevance_cap() {
        let registry = registry_with(vec![Grammar::new(
            "loop",
            Mode::new().keywords(Keywords::words("for|1")),
        )]);
        let result = run(&registry, "loop", "for for for for for for for for");
        assert_eq!(result.relevance, 7);
    }

    #[test]
    fn test_unterminated_string_is_closed_at_end() {
        let registry = registry_with(vec![Grammar::new("s", Mode::new().child(string_mode()))]);
        let result = run(&registry, "s", "\"abc");
        assert_eq!(result.value, "<span class=\"hljs-string\">&quot;abc</span>");
        assert_eq!(result.relevance, 1);
        assert!(!result.illegal);
    }

    #[test]
    fn test_illegal_in_debug_mode_propagates() {
        let registry = registry_with(vec![Grammar::new("s", Mode::new().child(string_mode()))]);
        let options = ScanOptions {
            ignore_illegals: false,
            safe_mode: false,
        };
        let err = highlight(&registry, "s", "x \"ab\ncd\"", options, None).unwrap_err();
        match err {
            HighlightError::IllegalToken(context) => {
                assert_eq!(context.index, 5);
                assert_eq!(context.mode, "string");
                assert_eq!(context.language, "s");
                assert!(context.result_so_far.starts_with("x "));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_illegal_in_safe_mode_is_flagged() {
        let registry = registry_with(vec![Grammar::new("s", Mode::new().child(string_mode()))]);
        let options = ScanOptions {
            ignore_illegals: false,
            safe_mode: true,
        };
        let result = highlight(&registry, "s", "\"a\nb", options, None).unwrap();
        assert!(result.illegal);
        assert_eq!(result.relevance, 0);
        assert_eq!(result.value, "&quot;a\nb");
        assert_eq!(result.illegal_by.unwrap().index, 2);
    }

    #[test]
    fn test_exclude_begin_and_end() {
        let mode = Mode::new()
            .scope("inner")
            .begin(r"\(")
            .end(r"\)")
            .exclude_begin()
            .exclude_end();
        let registry = registry_with(vec![Grammar::new("p", Mode::new().child(mode))]);
        let result = run(&registry, "p", "f(x)");
        assert_eq!(result.value, "f(<span class=\"hljs-inner\">x</span>)");
    }

    #[test]
    fn test_return_begin_rescans_lexeme() {
        let title = Mode::new().scope("title").matching(r"\w+");
        let function = Mode::new()
            .scope("function")
            .begin(r"\w+\(")
            .return_begin()
            .end(r"\)")
            .child(title);
        let registry = registry_with(vec![Grammar::new("f", Mode::new().child(function))]);
        let result = run(&registry, "f", "go()");
        assert_eq!(
            result.value,
            "<span class=\"hljs-function\"><span class=\"hljs-title\">go</span>()</span>"
        );
    }

    #[test]
    fn test_ends_with_parent() {
        let value = Mode::new().scope("value").begin("=").ends_with_parent();
        let attr = Mode::new().scope("attr").begin(r"\w+").end(";").child(value);
        let registry = registry_with(vec![Grammar::new("a", Mode::new().child(attr))]);
        let result = run(&registry, "a", "k=v; !");
        assert_eq!(
            result.value,
            "<span class=\"hljs-attr\">k<span class=\"hljs-value\">=v;</span></span> !"
        );
    }

    #[test]
    fn test_starts_continuation() {
        let name = Mode::new().scope("name").matching(r"\w+").starts(
            Mode::new().scope("rest").end("$"),
        );
        let registry = registry_with(vec![Grammar::new("c", Mode::new().child(name))]);
        let result = run(&registry, "c", "cmd arg");
        assert_eq!(
            result.value,
            "<span class=\"hljs-name\">cmd</span><span class=\"hljs-rest\"> arg</span>"
        );
    }

    #[test]
    fn test_segment_scopes() {
        let mode = Mode::new()
            .begin(Pattern::segments([r"fn", r"\s+", r"\w+"]))
            .begin_scope(ScopeSpec::segments([(1, "keyword"), (3, "title.function")]));
        let registry = registry_with(vec![Grammar::new("r", Mode::new().child(mode))]);
        let result = run(&registry, "r", "fn main");
        assert_eq!(
            result.value,
            "<span class=\"hljs-keyword\">fn</span> <span class=\"hljs-title function_\">main</span>"
        );
    }

    #[test]
    fn test_hidden_keywords_add_relevance_only() {
        let keywords = Keywords::categories()
            .category("keyword", "let")
            .category("_marker", "mut|3");
        let registry = registry_with(vec![Grammar::new("h", Mode::new().keywords(keywords))]);
        let result = run(&registry, "h", "let mut x");
        assert_eq!(result.value, "<span class=\"hljs-keyword\">let</span> mut x");
        assert_eq!(result.relevance, 4);
    }

    #[test]
    fn test_keywords_are_case_folded() {
        let grammar = Grammar::new("sql", Mode::new().keywords(Keywords::words("select")))
            .case_insensitive();
        let registry = registry_with(vec![grammar]);
        let result = run(&registry, "sql", "SELECT 1");
        assert_eq!(result.value, "<span class=\"hljs-keyword\">SELECT</span> 1");
    }

    #[test]
    fn test_begin_keywords_skip_after_dot() {
        let class = Mode::new().scope("class").begin_keywords("class").end(r"\{");
        let registry = registry_with(vec![Grammar::new("k", Mode::new().child(class))]);
        let result = run(&registry, "k", "a.class class {");
        assert_eq!(
            result.value,
            "a.class <span class=\"hljs-class\"><span class=\"hljs-keyword\">class</span> {</span>"
        );
    }

    #[test]
    fn test_zero_width_guard_in_debug_mode() {
        let empty = Mode::new().scope("empty").begin("x*").end("y*");
        let registry = registry_with(vec![Grammar::new("z", Mode::new().child(empty))]);
        let options = ScanOptions {
            ignore_illegals: true,
            safe_mode: false,
        };
        let err = highlight(&registry, "z", "abc", options, None).unwrap_err();
        assert!(matches!(err, HighlightError::EngineFault { rule: Some(ref r), .. } if r == "empty"));
    }

    #[test]
    fn test_zero_width_guard_in_safe_mode_advances() {
        let empty = Mode::new().scope("empty").begin("x*").end("y*");
        let registry = registry_with(vec![Grammar::new("z", Mode::new().child(empty))]);
        let options = ScanOptions {
            ignore_illegals: true,
            safe_mode: true,
        };
        let result = highlight(&registry, "z", "abc", options, None).unwrap();
        assert_eq!(result.text(), "abc");
        assert!(result.error_raised.is_none());
    }

    #[test]
    fn test_begin_end_cycle_at_one_offset_is_a_fault() {
        let cycle = Mode::new()
            .scope("cycle")
            .begin("a")
            .return_begin()
            .end("a")
            .return_end();
        let mut registry = Registry::with_config(Config {
            iteration_floor: 50,
            ..Config::default()
        });
        registry
            .register_grammar(Grammar::new("cycle", Mode::new().child(cycle)))
            .unwrap();

        let strict = ScanOptions {
            ignore_illegals: true,
            safe_mode: false,
        };
        let err = highlight(&registry, "cycle", "a", strict, None).unwrap_err();
        assert!(matches!(err, HighlightError::EngineFault { .. }));

        let safe = ScanOptions {
            ignore_illegals: true,
            safe_mode: true,
        };
        let result = highlight(&registry, "cycle", "a", safe, None).unwrap();
        assert_eq!(result.value, "a");
        assert!(result.error_raised.is_some());
    }

    #[test]
    fn test_huge_iteration_ratio_does_not_overflow() {
        let mut registry = Registry::with_config(Config {
            iteration_floor: 0,
            iteration_ratio: usize::MAX,
            ..Config::default()
        });
        registry
            .register_grammar(Grammar::new("s", Mode::new().child(string_mode())))
            .unwrap();
        let result = run(&registry, "s", "x \"a\" \"b\"");
        assert_eq!(result.text(), "x \"a\" \"b\"");
    }

    #[test]
    fn test_sublanguage_split_counts_relevance_once() {
        let inner = Grammar::new(
            "inner",
            Mode::new().child(Mode::new().scope("string").begin("\"").end("\"").relevance(5)),
        );
        let segment = Mode::new().begin(r"\[").end(r"\]").sub_language("inner");
        let outer = Grammar::new("outer", Mode::new().child(segment));
        let registry = registry_with(vec![inner, outer]);

        let whole = run(&registry, "inner", "\"ab\"");
        let split = run(&registry, "outer", "[\"a] [b\"]");
        assert_eq!(whole.relevance, 5);
        assert_eq!(split.relevance, whole.relevance);
    }

    #[test]
    fn test_unknown_sublanguage_is_plain_text() {
        let registry = registry_with(vec![Grammar::new(
            "outer",
            Mode::new().sub_language("missing"),
        )]);
        let result = run(&registry, "outer", "a<b");
        assert_eq!(result.value, "a&lt;b");
    }

    #[test]
    fn test_context_window_respects_char_boundaries() {
        let text = "ééé";
        assert_eq!(context_window(text, 2, 1), "éé");
        assert_eq!(context_window(text, 2, 100), text);
        assert_eq!(context_window("", 0, 10), "");
    }
}
