use std::ops::Range;

use logos::Logos;

/// Raw tokens produced by logos for flat tokenization of document text.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
	#[token(":[")]
	DirectiveOpen,
	#[token("[")]
	BracketOpen,
	#[token("]")]
	BracketClose,
	#[token("(")]
	ParenOpen,
	#[token(")")]
	ParenClose,
	#[token(":")]
	Colon,
	#[token("\n")]
	Newline,
	#[regex(r"[ \t\r]+")]
	Whitespace,
	#[regex(r"[^ \t\r\n\[\]():]+")]
	Text,
}

/// Context states for the walker that assembles directives out of raw
/// tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerContext {
	/// Outside of any directive.
	Outside,
	/// After `:[`, collecting the label up to the first `]`.
	Label,
	/// After `]`, the next token must be `(`.
	AwaitTarget,
	/// Inside the parentheses, collecting the target.
	Target,
	/// After the target and some whitespace, collecting the secondary token.
	Secondary,
}

/// Byte ranges of the parts of one matched directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDirective {
	pub span: Range<usize>,
	pub label: Range<usize>,
	pub target: Range<usize>,
	pub secondary: Option<Range<usize>>,
}

#[derive(Debug, Default)]
struct Pending {
	/// Index of the `:[` token, used to backtrack on a failed match.
	open_cursor: usize,
	/// Index of the `]` closing the label, once seen.
	label_close_cursor: Option<usize>,
	start: usize,
	label_start: usize,
	label_end: usize,
	target_start: usize,
	target_end: usize,
	secondary_start: Option<usize>,
}

/// Walks the logos token stream, building [`RawDirective`]s.
struct DirectiveWalker {
	/// The collected raw tokens and their byte spans.
	raw_tokens: Vec<(Result<RawToken, ()>, Range<usize>)>,
	/// Current index into `raw_tokens`.
	cursor: usize,
	context: LexerContext,
	pending: Pending,
	directives: Vec<RawDirective>,
}

impl DirectiveWalker {
	fn new(source: &str) -> Self {
		let raw_tokens: Vec<_> = RawToken::lexer(source).spanned().collect();

		Self {
			raw_tokens,
			cursor: 0,
			context: LexerContext::Outside,
			pending: Pending::default(),
			directives: vec![],
		}
	}

	/// Abandon the current partial match and resume scanning.
	///
	/// Any `:[` inside the abandoned label shares its closing `]` and fails the
	/// same way, so scanning resumes after that `]` when the label was closed,
	/// and right after the opening `:[` otherwise.
	fn backtrack(&mut self) {
		self.cursor = self
			.pending
			.label_close_cursor
			.unwrap_or(self.pending.open_cursor)
			+ 1;
		self.context = LexerContext::Outside;
		self.pending = Pending::default();
	}

	fn finish(&mut self, end: usize, secondary_end: Option<usize>) {
		let pending = std::mem::take(&mut self.pending);
		let secondary = pending
			.secondary_start
			.zip(secondary_end)
			.filter(|(start, end)| start < end)
			.map(|(start, end)| start..end);

		self.directives.push(RawDirective {
			span: pending.start..end,
			label: pending.label_start..pending.label_end,
			target: pending.target_start..pending.target_end,
			secondary,
		});
		self.context = LexerContext::Outside;
		self.cursor += 1;
	}

	fn process(&mut self) {
		while self.cursor < self.raw_tokens.len() {
			let (result, span) = &self.raw_tokens[self.cursor];
			let span = span.clone();
			// Unrecognized bytes behave like text.
			let token = result.unwrap_or(RawToken::Text);

			match self.context {
				LexerContext::Outside => {
					if token == RawToken::DirectiveOpen {
						self.pending = Pending {
							open_cursor: self.cursor,
							start: span.start,
							label_start: span.end,
							..Pending::default()
						};
						self.context = LexerContext::Label;
					}
					self.cursor += 1;
				}
				LexerContext::Label => {
					if token == RawToken::BracketClose {
						self.pending.label_end = span.start;
						self.pending.label_close_cursor = Some(self.cursor);
						self.context = LexerContext::AwaitTarget;
					}
					self.cursor += 1;
				}
				LexerContext::AwaitTarget => {
					if token == RawToken::ParenOpen {
						self.pending.target_start = span.end;
						self.context = LexerContext::Target;
						self.cursor += 1;
					} else {
						self.backtrack();
					}
				}
				LexerContext::Target => {
					let target_is_empty = span.start == self.pending.target_start;
					match token {
						RawToken::Newline => self.backtrack(),
						RawToken::Whitespace | RawToken::ParenClose if target_is_empty => {
							self.backtrack();
						}
						RawToken::Whitespace => {
							self.pending.target_end = span.start;
							self.pending.secondary_start = Some(span.end);
							self.context = LexerContext::Secondary;
							self.cursor += 1;
						}
						RawToken::ParenClose => {
							self.pending.target_end = span.start;
							self.finish(span.end, None);
						}
						_ => self.cursor += 1,
					}
				}
				LexerContext::Secondary => {
					match token {
						RawToken::Newline => self.backtrack(),
						RawToken::ParenClose => self.finish(span.end, Some(span.start)),
						_ => self.cursor += 1,
					}
				}
			}
		}
	}
}

/// Find every `:[label](target secondary)` occurrence in `source`, left to
/// right and non-overlapping.
pub(crate) fn tokenize(source: &str) -> Vec<RawDirective> {
	if !source.contains(":[") {
		return Vec::new();
	}

	let mut walker = DirectiveWalker::new(source);
	walker.process();
	walker.directives
}
