//! Abstract Syntax Tree definitions for regex patterns
//!
//! The tree is built by an external parser (or read from JSON) and is treated
//! as read-only by every later stage.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Result};

/// One alternative: a sequence of parts matched one after another
pub type Branch = Vec<Part>;

/// A complete pattern (the root container)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub branches: Branches,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branches(branches: Branches) -> Self {
        Self { branches }
    }

    /// Read a pattern from its JSON form and validate it
    pub fn from_json(source: &str) -> Result<Self> {
        let pattern: Pattern = serde_json::from_str(source)?;
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Re-check every construction invariant over the whole tree.
    ///
    /// Trees built through the constructors are always valid; trees coming
    /// from deserialization are not, so the pipeline calls this first.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        validate_branches(&self.branches, &mut seen)
    }

    /// Largest explicit part id anywhere in the tree
    pub fn max_part_id(&self) -> Option<u32> {
        let mut max = None;
        for branch in self.branches.iter() {
            for part in branch {
                part.visit(&mut |p| {
                    if let Some(id) = p.id() {
                        max = Some(max.map_or(id, |m: u32| m.max(id)));
                    }
                });
            }
        }
        max
    }
}

fn validate_branches(branches: &Branches, seen: &mut HashSet<u32>) -> Result<()> {
    for branch in branches.iter() {
        for part in branch {
            validate_part(part, seen)?;
        }
    }
    Ok(())
}

fn validate_part(part: &Part, seen: &mut HashSet<u32>) -> Result<()> {
    if let Some(id) = part.id() {
        if !seen.insert(id) {
            return Err(Error::DuplicatePartId(id));
        }
    }
    match part {
        Part::Range(range) => check_range(range.start, range.end),
        Part::CharacterClass(class) => {
            for item in &class.items {
                if let ClassItem::Range(range) = item {
                    check_range(range.start, range.end)?;
                }
            }
            Ok(())
        }
        Part::Quantifier(q) => {
            check_bounds(q.min, q.max)?;
            validate_branches(&q.branches, seen)
        }
        Part::Subexpression(sub) => validate_branches(&sub.branches, seen),
        Part::AssertComplex(assert) => validate_branches(&assert.branches, seen),
        Part::ConditionalSubexpression(cond) => {
            check_condition(&cond.condition)?;
            validate_part(&cond.condition, seen)?;
            for part in cond.branch_true.iter().chain(cond.branch_false.iter()) {
                validate_part(part, seen)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_bounds(min: u32, max: Option<u32>) -> Result<()> {
    match max {
        Some(max) if max < min => Err(Error::QuantifierBounds { min, max }),
        _ => Ok(()),
    }
}

fn check_range(start: char, end: char) -> Result<()> {
    if start > end {
        Err(Error::RangeOrder { start, end })
    } else {
        Ok(())
    }
}

fn check_condition(condition: &Part) -> Result<()> {
    match condition {
        Part::SubexpressionCall(_) | Part::AssertComplex(_) => Ok(()),
        other => Err(Error::InvalidCondition(other.kind_name().to_string())),
    }
}

// ==================== Branches ====================

/// Ordered alternatives of a container.
///
/// One branch is plain concatenation, several mean "any of these".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Branches {
    branches: Vec<Branch>,
}

impl Branches {
    /// A single empty branch
    pub fn new() -> Self {
        Self { branches: vec![Vec::new()] }
    }

    pub fn single(parts: Vec<Part>) -> Self {
        Self { branches: vec![parts] }
    }

    /// Append a part to the last branch
    pub fn push(&mut self, part: impl Into<Part>) {
        if self.branches.is_empty() {
            self.branches.push(Vec::new());
        }
        if let Some(last) = self.branches.last_mut() {
            last.push(part.into());
        }
    }

    /// Start a new alternative
    pub fn new_branch(&mut self) {
        self.branches.push(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Branch> {
        self.branches.iter()
    }

    pub fn as_slice(&self) -> &[Branch] {
        &self.branches
    }
}

impl Default for Branches {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Branch>> for Branches {
    fn from(branches: Vec<Branch>) -> Self {
        Self { branches }
    }
}

// ==================== Parts ====================

/// A piece of a regex pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text(Text),
    Assert(Assert),
    Charflag(Charflag),
    Backreference(Backreference),
    SubexpressionCall(SubexpressionCall),
    CharacterClass(CharacterClass),
    Range(Range),
    Quantifier(Quantifier),
    Subexpression(Subexpression),
    AssertComplex(AssertComplex),
    ConditionalSubexpression(ConditionalSubexpression),
    OptionCaseSensitivity(OptionCaseSensitivity),
}

impl Part {
    pub fn id(&self) -> Option<u32> {
        match self {
            Part::Text(p) => p.id,
            Part::Assert(p) => p.id,
            Part::Charflag(p) => p.id,
            Part::Backreference(p) => p.id,
            Part::SubexpressionCall(p) => p.id,
            Part::CharacterClass(p) => p.id,
            Part::Range(p) => p.id,
            Part::Quantifier(p) => p.id,
            Part::Subexpression(p) => p.id,
            Part::AssertComplex(p) => p.id,
            Part::ConditionalSubexpression(p) => p.id,
            Part::OptionCaseSensitivity(p) => p.id,
        }
    }

    /// Variant name, used in diagnostics and as the node type tag
    pub fn kind_name(&self) -> &'static str {
        match self {
            Part::Text(_) => "Text",
            Part::Assert(_) => "Assert",
            Part::Charflag(_) => "Charflag",
            Part::Backreference(_) => "Backreference",
            Part::SubexpressionCall(_) => "SubexpressionCall",
            Part::CharacterClass(_) => "CharacterClass",
            Part::Range(_) => "Range",
            Part::Quantifier(_) => "Quantifier",
            Part::Subexpression(_) => "Subexpression",
            Part::AssertComplex(_) => "AssertComplex",
            Part::ConditionalSubexpression(_) => "ConditionalSubexpression",
            Part::OptionCaseSensitivity(_) => "OptionCaseSensitivity",
        }
    }

    /// Whether the part carries a resolved case-sensitivity flag
    pub fn is_case_aware(&self) -> bool {
        matches!(
            self,
            Part::Text(_)
                | Part::Charflag(_)
                | Part::Backreference(_)
                | Part::SubexpressionCall(_)
                | Part::CharacterClass(_)
        )
    }

    /// Alternatives owned by a container part
    pub fn branches(&self) -> Option<&Branches> {
        match self {
            Part::Quantifier(q) => Some(&q.branches),
            Part::Subexpression(s) => Some(&s.branches),
            Part::AssertComplex(a) => Some(&a.branches),
            _ => None,
        }
    }

    /// Pre-order visit of this part and everything nested in it
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Part)) {
        f(self);
        if let Some(branches) = self.branches() {
            for branch in branches.iter() {
                for part in branch {
                    part.visit(f);
                }
            }
        }
        if let Part::ConditionalSubexpression(cond) = self {
            cond.condition.visit(f);
            for part in cond.branch_true.iter().chain(cond.branch_false.iter()) {
                part.visit(f);
            }
        }
    }
}

/// Literal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub text: String,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self { id: None, text: text.into() }
    }
}

/// Zero-width assertion kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertKind {
    WordBoundary,
    NotWordBoundary,
    StartOfString,
    EndOfString,
}

impl AssertKind {
    pub fn description(self) -> &'static str {
        match self {
            AssertKind::WordBoundary => "word boundary",
            AssertKind::NotWordBoundary => "not word boundary",
            AssertKind::StartOfString => "start of string",
            AssertKind::EndOfString => "end of string",
        }
    }
}

/// Simple zero-width assertion (`\b`, `^`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub kind: AssertKind,
}

impl Assert {
    pub fn new(kind: AssertKind) -> Self {
        Self { id: None, kind }
    }
}

// ==================== Character Flags ====================

/// POSIX bracket classes (`[:alpha:]`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosixClass {
    Alnum,
    Alpha,
    Ascii,
    Blank,
    Cntrl,
    Digit,
    Graph,
    Lower,
    Print,
    Punct,
    Space,
    Upper,
    Word,
    Xdigit,
}

/// Unicode general categories (`\p{L}`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnicodeCategory {
    Letter,
    LowercaseLetter,
    UppercaseLetter,
    TitlecaseLetter,
    Mark,
    Number,
    DecimalNumber,
    Punctuation,
    Symbol,
    Separator,
    Control,
    Other,
}

/// Unicode scripts (`\p{Greek}`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnicodeScript {
    Arabic,
    Armenian,
    Common,
    Cyrillic,
    Devanagari,
    Greek,
    Han,
    Hangul,
    Hebrew,
    Hiragana,
    Katakana,
    Latin,
    Thai,
}

/// Single-character class shorthands.
///
/// Each kind is its own case; negation is carried separately by [`Charflag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharflagKind {
    Any,
    Digit,
    Space,
    Word,
    HexDigit,
    HorizontalSpace,
    VerticalSpace,
    LineBreak,
    Posix(PosixClass),
    Category(UnicodeCategory),
    Script(UnicodeScript),
}

impl CharflagKind {
    pub fn description(self) -> &'static str {
        match self {
            CharflagKind::Any => "any character",
            CharflagKind::Digit => "digit",
            CharflagKind::Space => "whitespace",
            CharflagKind::Word => "word character",
            CharflagKind::HexDigit => "hexadecimal digit",
            CharflagKind::HorizontalSpace => "horizontal whitespace",
            CharflagKind::VerticalSpace => "vertical whitespace",
            CharflagKind::LineBreak => "line break",
            CharflagKind::Posix(class) => match class {
                PosixClass::Alnum => "letter or digit (POSIX)",
                PosixClass::Alpha => "letter (POSIX)",
                PosixClass::Ascii => "ASCII character (POSIX)",
                PosixClass::Blank => "space or tab (POSIX)",
                PosixClass::Cntrl => "control character (POSIX)",
                PosixClass::Digit => "digit (POSIX)",
                PosixClass::Graph => "visible character (POSIX)",
                PosixClass::Lower => "lowercase letter (POSIX)",
                PosixClass::Print => "printable character (POSIX)",
                PosixClass::Punct => "punctuation (POSIX)",
                PosixClass::Space => "whitespace (POSIX)",
                PosixClass::Upper => "uppercase letter (POSIX)",
                PosixClass::Word => "word character (POSIX)",
                PosixClass::Xdigit => "hexadecimal digit (POSIX)",
            },
            CharflagKind::Category(category) => match category {
                UnicodeCategory::Letter => "Unicode letter",
                UnicodeCategory::LowercaseLetter => "Unicode lowercase letter",
                UnicodeCategory::UppercaseLetter => "Unicode uppercase letter",
                UnicodeCategory::TitlecaseLetter => "Unicode titlecase letter",
                UnicodeCategory::Mark => "Unicode mark",
                UnicodeCategory::Number => "Unicode number",
                UnicodeCategory::DecimalNumber => "Unicode decimal digit",
                UnicodeCategory::Punctuation => "Unicode punctuation",
                UnicodeCategory::Symbol => "Unicode symbol",
                UnicodeCategory::Separator => "Unicode separator",
                UnicodeCategory::Control => "Unicode control character",
                UnicodeCategory::Other => "Unicode other character",
            },
            CharflagKind::Script(script) => match script {
                UnicodeScript::Arabic => "Arabic script character",
                UnicodeScript::Armenian => "Armenian script character",
                UnicodeScript::Common => "Common script character",
                UnicodeScript::Cyrillic => "Cyrillic script character",
                UnicodeScript::Devanagari => "Devanagari script character",
                UnicodeScript::Greek => "Greek script character",
                UnicodeScript::Han => "Han script character",
                UnicodeScript::Hangul => "Hangul script character",
                UnicodeScript::Hebrew => "Hebrew script character",
                UnicodeScript::Hiragana => "Hiragana script character",
                UnicodeScript::Katakana => "Katakana script character",
                UnicodeScript::Latin => "Latin script character",
                UnicodeScript::Thai => "Thai script character",
            },
        }
    }
}

/// Character class shorthand (`\d`, `\W`, `\p{Lu}`, `[:alpha:]`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charflag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub kind: CharflagKind,
    #[serde(default)]
    pub negated: bool,
}

impl Charflag {
    pub fn new(kind: CharflagKind) -> Self {
        Self { id: None, kind, negated: false }
    }

    pub fn negated(kind: CharflagKind) -> Self {
        Self { id: None, kind, negated: true }
    }

    pub fn description(&self) -> String {
        if self.negated {
            format!("not {}", self.kind.description())
        } else {
            self.kind.description().to_string()
        }
    }

    /// Equality ignoring the part id
    fn same_flag(&self, other: &Charflag) -> bool {
        self.kind == other.kind && self.negated == other.negated
    }
}

// ==================== References ====================

/// Backreference to a numbered group (`\1`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub number: u32,
}

impl Backreference {
    pub fn new(number: u32) -> Self {
        Self { id: None, number }
    }
}

/// Target of a subexpression call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallTarget {
    Number(u32),
    Name(String),
}

/// Subexpression call (`(?1)`, `(?&name)`, `(?R)`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubexpressionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// `None` calls the whole pattern
    #[serde(default)]
    pub target: Option<CallTarget>,
    #[serde(default)]
    pub recursive: bool,
}

impl SubexpressionCall {
    pub fn new(target: Option<CallTarget>, recursive: bool) -> Self {
        Self { id: None, target, recursive }
    }
}

// ==================== Character Classes ====================

/// Non-literal member of a character class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassItem {
    Charflag(Charflag),
    Range(Range),
}

impl ClassItem {
    fn same_item(&self, other: &ClassItem) -> bool {
        match (self, other) {
            (ClassItem::Charflag(a), ClassItem::Charflag(b)) => a.same_flag(b),
            (ClassItem::Range(a), ClassItem::Range(b)) => a.start == b.start && a.end == b.end,
            _ => false,
        }
    }

    pub fn description(&self) -> String {
        match self {
            ClassItem::Charflag(flag) => flag.description(),
            ClassItem::Range(range) => range.description(),
        }
    }
}

/// Bracketed character class (`[a-z\d_]`, `[^abc]`)
///
/// Deserialized classes go through the same coalescing as `add_part`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCharacterClass")]
pub struct CharacterClass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default)]
    pub inverted: bool,
    /// Literal characters, each kept once
    #[serde(default)]
    text: String,
    #[serde(default)]
    items: Vec<ClassItem>,
}

impl CharacterClass {
    pub fn new(inverted: bool) -> Self {
        Self { inverted, ..Self::default() }
    }

    /// Add a member; only text, charflags and ranges are accepted
    pub fn add_part(&mut self, part: Part) -> Result<()> {
        match part {
            Part::Text(text) => {
                self.add_text(&text.text);
                Ok(())
            }
            Part::Charflag(flag) => {
                self.add_item(ClassItem::Charflag(flag));
                Ok(())
            }
            Part::Range(range) => {
                self.add_item(ClassItem::Range(range));
                Ok(())
            }
            other => Err(Error::InvalidClassMember(other.kind_name().to_string())),
        }
    }

    fn add_text(&mut self, text: &str) {
        for ch in text.chars() {
            if !self.text.contains(ch) {
                self.text.push(ch);
            }
        }
    }

    fn add_item(&mut self, item: ClassItem) {
        if !self.items.iter().any(|existing| existing.same_item(&item)) {
            self.items.push(item);
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn items(&self) -> &[ClassItem] {
        &self.items
    }

    /// Human-readable list of members
    pub fn description(&self) -> String {
        let mut members = Vec::new();
        if !self.text.is_empty() {
            members.push(self.text.clone());
        }
        members.extend(self.items.iter().map(ClassItem::description));
        let prefix = if self.inverted { "none of" } else { "any of" };
        format!("{}: {}", prefix, members.join(", "))
    }
}

/// Wire form of a character class, before coalescing
#[derive(Deserialize)]
struct RawCharacterClass {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    inverted: bool,
    #[serde(default)]
    text: String,
    #[serde(default)]
    items: Vec<ClassItem>,
}

impl From<RawCharacterClass> for CharacterClass {
    fn from(raw: RawCharacterClass) -> Self {
        let mut class = CharacterClass::new(raw.inverted);
        class.id = raw.id;
        class.add_text(&raw.text);
        for item in raw.items {
            class.add_item(item);
        }
        class
    }
}

/// Character range (`a-z`); `start <= end` by codepoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    start: char,
    end: char,
}

impl Range {
    pub fn new(start: char, end: char) -> Result<Self> {
        check_range(start, end)?;
        Ok(Self { id: None, start, end })
    }

    pub fn start(&self) -> char {
        self.start
    }

    pub fn end(&self) -> char {
        self.end
    }

    pub fn set_start(&mut self, start: char) -> Result<()> {
        check_range(start, self.end)?;
        self.start = start;
        Ok(())
    }

    pub fn set_end(&mut self, end: char) -> Result<()> {
        check_range(self.start, end)?;
        self.end = end;
        Ok(())
    }

    pub fn description(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

// ==================== Containers ====================

/// Repetition of its branches between `min` and `max` times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    min: u32,
    /// `None` is unbounded
    #[serde(default)]
    max: Option<u32>,
    #[serde(default = "default_greedy")]
    pub greedy: bool,
    #[serde(default)]
    pub branches: Branches,
}

fn default_greedy() -> bool {
    true
}

impl Quantifier {
    pub fn new(min: u32, max: Option<u32>, greedy: bool, branches: Branches) -> Result<Self> {
        check_bounds(min, max)?;
        Ok(Self { id: None, min, max, greedy, branches })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn set_bounds(&mut self, min: u32, max: Option<u32>) -> Result<()> {
        check_bounds(min, max)?;
        self.min = min;
        self.max = max;
        Ok(())
    }
}

/// Group: capturing when `number` is present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subexpression {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
    /// Synthetic container, not written by the user
    #[serde(default)]
    pub wrapper: bool,
    #[serde(default)]
    pub branches: Branches,
}

impl Subexpression {
    pub fn capturing(number: u32, branches: Branches) -> Self {
        Self { id: None, number: Some(number), wrapper: false, branches }
    }

    pub fn grouping(branches: Branches) -> Self {
        Self { id: None, number: None, wrapper: false, branches }
    }
}

/// Lookaround kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookKind {
    PositiveLookahead,
    NegativeLookahead,
    PositiveLookbehind,
    NegativeLookbehind,
}

impl LookKind {
    pub fn description(self) -> &'static str {
        match self {
            LookKind::PositiveLookahead => "positive lookahead",
            LookKind::NegativeLookahead => "negative lookahead",
            LookKind::PositiveLookbehind => "positive lookbehind",
            LookKind::NegativeLookbehind => "negative lookbehind",
        }
    }

    pub fn is_lookahead(self) -> bool {
        matches!(self, LookKind::PositiveLookahead | LookKind::NegativeLookahead)
    }
}

/// Lookaround assertion (`(?=...)`, `(?<!...)`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertComplex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub kind: LookKind,
    #[serde(default)]
    pub branches: Branches,
}

impl AssertComplex {
    pub fn new(kind: LookKind, branches: Branches) -> Self {
        Self { id: None, kind, branches }
    }
}

/// `(?(condition)yes|no)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalSubexpression {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    condition: Box<Part>,
    #[serde(default)]
    pub branch_true: Branch,
    #[serde(default)]
    pub branch_false: Branch,
}

impl ConditionalSubexpression {
    /// The condition must be a subexpression call or a lookaround
    pub fn new(condition: Part, branch_true: Branch, branch_false: Branch) -> Result<Self> {
        check_condition(&condition)?;
        Ok(Self {
            id: None,
            condition: Box::new(condition),
            branch_true,
            branch_false,
        })
    }

    pub fn condition(&self) -> &Part {
        &self.condition
    }

    pub fn set_condition(&mut self, condition: Part) -> Result<()> {
        check_condition(&condition)?;
        self.condition = Box::new(condition);
        Ok(())
    }
}

/// Inline case switch (`(?i)` is positive, `(?-i)` negative)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCaseSensitivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub positive: bool,
}

impl OptionCaseSensitivity {
    pub fn new(positive: bool) -> Self {
        Self { id: None, positive }
    }
}

macro_rules! impl_into_part {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for Part {
                fn from(part: $ty) -> Self {
                    Part::$ty(part)
                }
            }
        )*
    };
}

impl_into_part!(
    Text,
    Assert,
    Charflag,
    Backreference,
    SubexpressionCall,
    CharacterClass,
    Range,
    Quantifier,
    Subexpression,
    AssertComplex,
    ConditionalSubexpression,
    OptionCaseSensitivity,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantifier_rejects_reversed_bounds() {
        let err = Quantifier::new(5, Some(2), true, Branches::new()).unwrap_err();
        assert_eq!(err, Error::QuantifierBounds { min: 5, max: 2 });

        assert!(Quantifier::new(2, Some(2), true, Branches::new()).is_ok());
        assert!(Quantifier::new(7, None, false, Branches::new()).is_ok());
    }

    #[test]
    fn test_quantifier_set_bounds_keeps_old_values_on_error() {
        let mut q = Quantifier::new(1, Some(3), true, Branches::new()).unwrap();
        assert!(q.set_bounds(4, Some(1)).is_err());
        assert_eq!((q.min(), q.max()), (1, Some(3)));
    }

    #[test]
    fn test_range_order() {
        assert!(Range::new('a', 'z').is_ok());
        assert!(Range::new('x', 'x').is_ok());
        assert_eq!(
            Range::new('z', 'a').unwrap_err(),
            Error::RangeOrder { start: 'z', end: 'a' }
        );

        let mut range = Range::new('b', 'y').unwrap();
        assert!(range.set_start('z').is_err());
        assert!(range.set_end('a').is_err());
        assert!(range.set_end('c').is_ok());
        assert_eq!(range.description(), "b-c");
    }

    #[test]
    fn test_character_class_coalesces_and_dedupes() {
        let mut class = CharacterClass::new(false);
        class.add_part(Text::new("ab").into()).unwrap();
        class.add_part(Text::new("bc").into()).unwrap();
        class.add_part(Charflag::new(CharflagKind::Digit).into()).unwrap();
        class.add_part(Charflag::new(CharflagKind::Digit).into()).unwrap();
        class.add_part(Charflag::negated(CharflagKind::Digit).into()).unwrap();
        class.add_part(Range::new('x', 'z').unwrap().into()).unwrap();
        class.add_part(Range::new('x', 'z').unwrap().into()).unwrap();

        assert_eq!(class.text(), "abc");
        assert_eq!(class.items().len(), 3);
        assert_eq!(class.description(), "any of: abc, digit, not digit, x-z");
    }

    #[test]
    fn test_character_class_from_json_is_coalesced() {
        let json = r#"{"branches": [[{"type": "character_class", "text": "aab", "items": [
            {"type": "charflag", "kind": "digit"},
            {"type": "charflag", "kind": "digit"},
            {"type": "range", "start": "x", "end": "z"},
            {"type": "range", "start": "x", "end": "z"}
        ]}]]}"#;
        let pattern = Pattern::from_json(json).unwrap();
        let Part::CharacterClass(class) = &pattern.branches.as_slice()[0][0] else {
            panic!("expected a character class");
        };
        assert_eq!(class.text(), "ab");
        assert_eq!(class.items().len(), 2);
        assert_eq!(class.description(), "any of: ab, digit, x-z");
    }

    #[test]
    fn test_character_class_rejects_other_parts() {
        let mut class = CharacterClass::new(true);
        let err = class.add_part(Backreference::new(1).into()).unwrap_err();
        assert_eq!(err, Error::InvalidClassMember("Backreference".to_string()));
        assert!(class.items().is_empty());
    }

    #[test]
    fn test_conditional_condition_kinds() {
        let call = SubexpressionCall::new(Some(CallTarget::Number(1)), false);
        let mut cond = ConditionalSubexpression::new(call.into(), vec![], vec![]).unwrap();

        let err = cond.set_condition(Text::new("a").into()).unwrap_err();
        assert_eq!(err, Error::InvalidCondition("Text".to_string()));
        assert!(matches!(cond.condition(), Part::SubexpressionCall(_)));

        let look = AssertComplex::new(LookKind::NegativeLookbehind, Branches::new());
        assert!(cond.set_condition(look.into()).is_ok());

        assert!(ConditionalSubexpression::new(Text::new("a").into(), vec![], vec![]).is_err());
    }

    #[test]
    fn test_charflag_descriptions_are_distinct_by_name() {
        let posix_digit = Charflag::new(CharflagKind::Posix(PosixClass::Digit));
        let digit = Charflag::new(CharflagKind::Digit);
        assert_ne!(posix_digit.description(), digit.description());
        assert_eq!(Charflag::negated(CharflagKind::Space).description(), "not whitespace");
    }

    #[test]
    fn test_branches_push_and_alternate() {
        let mut branches = Branches::new();
        branches.push(Text::new("a"));
        branches.new_branch();
        branches.push(Text::new("b"));
        branches.push(Text::new("c"));
        assert_eq!(branches.len(), 2);
        assert_eq!(branches.as_slice()[1].len(), 2);
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let mut first = Text::new("a");
        first.id = Some(10);
        let mut second = Text::new("b");
        second.id = Some(10);
        let pattern = Pattern::with_branches(Branches::single(vec![first.into(), second.into()]));
        assert_eq!(pattern.validate().unwrap_err(), Error::DuplicatePartId(10));
    }

    #[test]
    fn test_from_json_validates() {
        let ok = r#"{"branches": [[
            {"type": "text", "text": "ab"},
            {"type": "quantifier", "min": 0, "branches": [[{"type": "charflag", "kind": "digit"}]]}
        ]]}"#;
        let pattern = Pattern::from_json(ok).unwrap();
        assert_eq!(pattern.branches.as_slice()[0].len(), 2);

        let bad = r#"{"branches": [[
            {"type": "quantifier", "min": 5, "max": 2, "branches": [[]]}
        ]]}"#;
        assert_eq!(
            Pattern::from_json(bad).unwrap_err(),
            Error::QuantifierBounds { min: 5, max: 2 }
        );

        let negative = r#"{"branches": [[{"type": "quantifier", "min": -1, "branches": [[]]}]]}"#;
        assert!(matches!(Pattern::from_json(negative), Err(Error::Json(_))));
    }

    #[test]
    fn test_max_part_id() {
        let mut inner = Text::new("x");
        inner.id = Some(42);
        let mut group = Subexpression::capturing(1, Branches::single(vec![inner.into()]));
        group.id = Some(7);
        let pattern = Pattern::with_branches(Branches::single(vec![group.into()]));
        assert_eq!(pattern.max_part_id(), Some(42));
        assert_eq!(Pattern::new().max_part_id(), None);
    }
}
