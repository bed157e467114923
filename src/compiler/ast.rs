use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Name given to a rule set that was not explicitly named in the statement
pub const DEFAULT_RULESET_NAME: &str = "no-name";

/// Granularity at which matching series are exported together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLevel {
    /// One entry per matching series
    Series,
    /// All matching series of one study
    Study,
    /// All matching series of one patient, across studies
    Patient,
    /// A single entry with every qualifying series
    Project,
}

impl OutputLevel {
    /// Parse the level keyword used after `select` (case-insensitive)
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "series" => Some(OutputLevel::Series),
            "study" => Some(OutputLevel::Study),
            "patient" => Some(OutputLevel::Patient),
            "project" => Some(OutputLevel::Project),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            OutputLevel::Series => "series",
            OutputLevel::Study => "study",
            OutputLevel::Patient => "patient",
            OutputLevel::Project => "project",
        }
    }
}

impl fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How a field's values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Numeric,
}

/// Group/element of the series number tag, the only numeric raw tag
pub const SERIES_NUMBER_TAG: (u16, u16) = (0x0020, 0x0011);

/// Series metadata fields that rules can test
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    SeriesDescription,
    StudyDescription,
    Modality,
    SequenceName,
    Manufacturer,
    ManufacturerModelName,
    ClassifyTypes,
    PatientId,
    PatientName,
    ImageCount,
    SequenceNumber,
    /// Raw tag addressed by group and element
    Tag { group: u16, element: u16 },
    /// A name outside the recognised set. Rules on it never match.
    Unknown(String),
}

impl Field {
    /// Every named field, in the order the rule search enumerates them
    pub const NAMED: [Field; 11] = [
        Field::SeriesDescription,
        Field::StudyDescription,
        Field::Modality,
        Field::SequenceName,
        Field::Manufacturer,
        Field::ManufacturerModelName,
        Field::ClassifyTypes,
        Field::PatientId,
        Field::PatientName,
        Field::ImageCount,
        Field::SequenceNumber,
    ];

    /// Resolve an identifier from a select statement.
    /// Matching is case-insensitive and accepts the DICOM-style aliases.
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "seriesdescription" => Field::SeriesDescription,
            "studydescription" => Field::StudyDescription,
            "modality" => Field::Modality,
            "sequencename" | "protocolname" => Field::SequenceName,
            "manufacturer" => Field::Manufacturer,
            "manufacturermodelname" => Field::ManufacturerModelName,
            "classifytypes" | "classifytype" => Field::ClassifyTypes,
            "patientid" => Field::PatientId,
            "patientname" => Field::PatientName,
            "imagecount" | "numimages" | "numslices" => Field::ImageCount,
            "sequencenumber" | "seriesnumber" => Field::SequenceNumber,
            _ => Field::Unknown(s.to_string()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Field::ImageCount | Field::SequenceNumber => ValueType::Numeric,
            Field::Tag { group, element } if (*group, *element) == SERIES_NUMBER_TAG => {
                ValueType::Numeric
            }
            _ => ValueType::Text,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Field::Unknown(_))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::SeriesDescription => "seriesDescription",
            Field::StudyDescription => "studyDescription",
            Field::Modality => "modality",
            Field::SequenceName => "sequenceName",
            Field::Manufacturer => "manufacturer",
            Field::ManufacturerModelName => "manufacturerModelName",
            Field::ClassifyTypes => "classifyTypes",
            Field::PatientId => "patientId",
            Field::PatientName => "patientName",
            Field::ImageCount => "imageCount",
            Field::SequenceNumber => "sequenceNumber",
            Field::Tag { group, element } => {
                return write!(f, "(\"0x{:04x}\",\"0x{:04x}\")", group, element);
            }
            Field::Unknown(name) => name,
        };
        f.write_str(name)
    }
}

/// Comparison operators of the select language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Exact string equality: `==` (or `=`)
    Equal,
    /// Case-sensitive substring: `contains` (or `containing`)
    Contains,
    /// Regular expression search: `regexp`
    Regexp,
    /// Numeric `<`
    Less,
    /// Numeric `>`
    Greater,
    /// Numeric `<=`
    LessEqual,
    /// Numeric `>=`
    GreaterEqual,
}

impl Operator {
    /// Parse operator from its token
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "==" | "=" => Some(Operator::Equal),
            "contains" | "containing" => Some(Operator::Contains),
            "regexp" => Some(Operator::Regexp),
            "<" => Some(Operator::Less),
            ">" => Some(Operator::Greater),
            "<=" => Some(Operator::LessEqual),
            ">=" => Some(Operator::GreaterEqual),
            _ => None,
        }
    }

    /// Canonical token used when a query is written back out
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::Contains => "contains",
            Operator::Regexp => "regexp",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Operator::Less | Operator::Greater | Operator::LessEqual | Operator::GreaterEqual
        )
    }
}

/// Errors raised while building a single rule
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("operator '{operator}' on field '{field}' needs a number, got '{value}'")]
    NotNumeric {
        field: String,
        operator: &'static str,
        value: String,
    },
}

/// Comparison value of a rule, prepared for its operator
#[derive(Debug, Clone)]
pub enum Matcher {
    Text(String),
    Number(f64),
    Regex { pattern: String, regex: Arc<Regex> },
}

impl Matcher {
    /// Create a regex matcher (pre-compiles the regex)
    pub fn try_regex(pattern: String) -> Result<Self, RuleError> {
        match Regex::new(&pattern) {
            Ok(regex) => Ok(Matcher::Regex { pattern, regex: Arc::new(regex) }),
            Err(source) => Err(RuleError::InvalidRegex { pattern, source }),
        }
    }

    /// The literal as written in a select statement
    pub fn literal(&self) -> String {
        match self {
            Matcher::Text(s) => s.clone(),
            Matcher::Number(n) => n.to_string(),
            Matcher::Regex { pattern, .. } => pattern.clone(),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Text(a), Matcher::Text(b)) => a == b,
            (Matcher::Number(a), Matcher::Number(b)) => a == b,
            (Matcher::Regex { pattern: a, .. }, Matcher::Regex { pattern: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// A single predicate: field, operator and comparison value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleDef", into = "RuleDef")]
pub struct Rule {
    field: Field,
    operator: Operator,
    matcher: Matcher,
}

impl Rule {
    /// Build a rule from its literal value.
    /// Regular expressions are compiled here and numeric operators require a number.
    pub fn new(field: Field, operator: Operator, value: &str) -> Result<Self, RuleError> {
        let matcher = match operator {
            Operator::Regexp => Matcher::try_regex(value.to_string())?,
            op if op.is_numeric() => match value.trim().parse::<f64>() {
                Ok(n) => Matcher::Number(n),
                Err(_) => {
                    return Err(RuleError::NotNumeric {
                        field: field.to_string(),
                        operator: op.token(),
                        value: value.to_string(),
                    })
                }
            },
            _ => Matcher::Text(value.to_string()),
        };
        Ok(Self { field, operator, matcher })
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.field, self.operator.token())?;
        match &self.matcher {
            Matcher::Number(n) => write!(f, "{}", n),
            other => write!(f, "{}", quote(&other.literal())),
        }
    }
}

/// Quote a text literal for a select statement.
/// Backslashes and double quotes are escaped with a backslash.
pub(crate) fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Serialized form of a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleDef {
    field: Field,
    operator: Operator,
    value: String,
}

impl TryFrom<RuleDef> for Rule {
    type Error = RuleError;

    fn try_from(def: RuleDef) -> Result<Self, Self::Error> {
        Rule::new(def.field, def.operator, &def.value)
    }
}

impl From<Rule> for RuleDef {
    fn from(rule: Rule) -> Self {
        RuleDef {
            value: rule.matcher.literal(),
            field: rule.field,
            operator: rule.operator,
        }
    }
}

/// Boolean combination of rules.
///
/// `Not` binds tighter than `All`, which binds tighter than `Any`. Use
/// [`Condition::all`] and [`Condition::any`] to build nested conditions so
/// that the written form parses back to the same tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Rule(Rule),
    Not(Box<Condition>),
    /// Every condition holds (true when empty)
    All(Vec<Condition>),
    /// At least one condition holds (false when empty)
    Any(Vec<Condition>),
}

impl Condition {
    /// Conjunction, flattening nested conjunctions and unwrapping a single term
    pub fn all(terms: Vec<Condition>) -> Self {
        let mut flat = Vec::with_capacity(terms.len());
        for term in terms {
            match term {
                Condition::All(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Condition::All(Vec::new()))
        } else {
            Condition::All(flat)
        }
    }

    /// Disjunction, flattening nested disjunctions and unwrapping a single term
    pub fn any(terms: Vec<Condition>) -> Self {
        let mut flat = Vec::with_capacity(terms.len());
        for term in terms {
            match term {
                Condition::Any(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Condition::Any(Vec::new()))
        } else {
            Condition::Any(flat)
        }
    }

    pub fn negate(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Leaf rules, left to right
    pub fn rules(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    /// Mutable leaf rules, left to right
    pub fn rules_mut(&mut self) -> Vec<&mut Rule> {
        let mut out = Vec::new();
        self.collect_mut(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Rule>) {
        match self {
            Condition::Rule(rule) => out.push(rule),
            Condition::Not(inner) => inner.collect(out),
            Condition::All(terms) | Condition::Any(terms) => terms.iter().for_each(|t| t.collect(out)),
        }
    }

    fn collect_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Rule>) {
        match self {
            Condition::Rule(rule) => out.push(rule),
            Condition::Not(inner) => inner.collect_mut(out),
            Condition::All(terms) | Condition::Any(terms) => {
                for term in terms.iter_mut() {
                    term.collect_mut(out);
                }
            }
        }
    }
}

impl From<Rule> for Condition {
    fn from(rule: Rule) -> Self {
        Condition::Rule(rule)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Rule(rule) => write!(f, "{}", rule),
            Condition::Not(inner) => match &**inner {
                Condition::Rule(_) | Condition::Not(_) => write!(f, "not {}", inner),
                _ => write!(f, "not ({})", inner),
            },
            Condition::All(terms) => {
                for (idx, term) in terms.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" and ")?;
                    }
                    match term {
                        Condition::Any(_) | Condition::All(_) => write!(f, "({})", term)?,
                        _ => write!(f, "{}", term)?,
                    }
                }
                Ok(())
            }
            Condition::Any(terms) => {
                for (idx, term) in terms.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" or ")?;
                    }
                    match term {
                        Condition::Any(_) => write!(f, "({})", term)?,
                        _ => write!(f, "{}", term)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Named condition describing one kind of series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub condition: Condition,
}

impl RuleSet {
    /// Rule set holding the conjunction of `rules`
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self::with_condition(name, Condition::all(rules.into_iter().map(Condition::Rule).collect()))
    }

    pub fn with_condition(name: impl Into<String>, condition: Condition) -> Self {
        Self { name: name.into(), condition }
    }

    /// Rule set holding a single rule and the default name
    pub fn with_rule(rule: Rule) -> Self {
        Self::new(DEFAULT_RULESET_NAME, vec![rule])
    }

    /// Leaf rules of the condition, left to right
    pub fn rules(&self) -> Vec<&Rule> {
        self.condition.rules()
    }

    pub fn rules_mut(&mut self) -> Vec<&mut Rule> {
        self.condition.rules_mut()
    }

    /// Conjoin one more rule to the condition
    pub fn push_rule(&mut self, rule: Rule) {
        let condition = std::mem::replace(&mut self.condition, Condition::All(Vec::new()));
        self.condition = Condition::all(vec![condition, Condition::Rule(rule)]);
    }

    /// True when the condition has no rules at all
    pub fn is_empty(&self) -> bool {
        self.rules().is_empty()
    }
}

/// A DICOM tag of the series claimed by a named rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesTag {
    pub series: String,
    pub group: u16,
    pub element: u16,
}

impl SeriesTag {
    pub fn new(series: impl Into<String>, group: u16, element: u16) -> Self {
        Self { series: series.into(), group, element }
    }
}

impl fmt::Display for SeriesTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = Field::Tag { group: self.group, element: self.element };
        write!(f, "{}@{}", quote(&self.series), tag)
    }
}

/// Cross-series consistency rule: the two tags must hold equal values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRule {
    pub left: SeriesTag,
    pub right: SeriesTag,
}

impl CheckRule {
    pub fn new(left: SeriesTag, right: SeriesTag) -> Self {
        Self { left, right }
    }

    /// Does the rule constrain series of the rule set called `name`
    pub fn mentions(&self, name: &str) -> bool {
        self.left.series == name || self.right.series == name
    }
}

impl fmt::Display for CheckRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.left, self.right)
    }
}

/// A compiled select statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub level: OutputLevel,
    pub rulesets: Vec<RuleSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckRule>,
}

impl Query {
    pub fn new(level: OutputLevel, rulesets: Vec<RuleSet>) -> Self {
        Self { level, rulesets, checks: Vec::new() }
    }

    pub fn with_checks(mut self, checks: Vec<CheckRule>) -> Self {
        self.checks = checks;
        self
    }

    /// Rule set names in rule set order
    pub fn names(&self) -> Vec<&str> {
        self.rulesets.iter().map(|rs| rs.name.as_str()).collect()
    }

    /// Total number of leaf rules across all rule sets
    pub fn rule_count(&self) -> usize {
        self.rulesets.iter().map(|rs| rs.rules().len()).sum()
    }

    /// Write the query back out as a select statement that parses to the same query
    pub fn to_select_string(&self) -> String {
        let mut stm = format!("select {} from study", self.level.keyword());
        for (idx, ruleset) in self.rulesets.iter().enumerate() {
            if idx > 0 {
                stm.push_str(" also");
            }
            stm.push_str(&format!(
                " where series named {} has {}",
                quote(&ruleset.name),
                ruleset.condition
            ));
        }
        if !self.checks.is_empty() {
            let checks: Vec<String> = self.checks.iter().map(|c| c.to_string()).collect();
            stm.push_str(" check ");
            stm.push_str(&checks.join(" and "));
        }
        stm
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_select_string())
    }
}
