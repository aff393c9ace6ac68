//! Recursive-descent parser for match rules
//!
//! Grammar:
//!
//! ```text
//! expr      := "(" expr OPER expr ")" | literal
//! OPER      := "AND" | "OR"
//! literal   := ["NEG"] predicate
//! predicate := "property" NAME "=" VALUE | "direction" ("input" | "output")
//! ```
//!
//! Whitespace is removed before parsing. A subexpression is split at the first
//! `AND`/`OR` found while exactly one parenthesis is open. `OR` is rejected
//! below an `AND`, so every accepted tree is already in disjunctive normal form.

use super::ParseError;
use tracing::trace;

const AND: &[u8] = b"AND";
const OR: &[u8] = b"OR";
const NEGATION_MARKER: &str = "NEG";

/// Raw literal text as found in the rule, before predicate compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralToken {
    pub negation: bool,
    pub text: String,
}

/// Binary operator tree produced by [`parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleNode {
    Literal(LiteralToken),
    And(Box<RuleNode>, Box<RuleNode>),
    Or(Box<RuleNode>, Box<RuleNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
}

impl Operator {
    fn keyword(self) -> &'static [u8] {
        match self {
            Operator::And => AND,
            Operator::Or => OR,
        }
    }
}

/// Parse rule text into an operator tree
pub fn parse(rule: &str) -> Result<RuleNode, ParseError> {
    let stripped: String = rule.chars().filter(|c| !c.is_whitespace()).collect();

    if stripped.is_empty() {
        return Err(ParseError::Empty);
    }

    parse_node(&stripped, true)
}

fn parse_node(text: &str, disjunction_allowed: bool) -> Result<RuleNode, ParseError> {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut braces_present = false;

    for (pos, &byte) in bytes.iter().enumerate() {
        match byte {
            b'(' => {
                braces_present = true;
                depth += 1;
            }
            b')' => depth -= 1,
            _ => {}
        }

        if depth < 0 {
            return Err(ParseError::UnbalancedParentheses(text.to_string()));
        }

        if depth != 1 {
            continue;
        }

        let rest = &bytes[pos..];
        if rest.starts_with(AND) {
            return split(text, pos, Operator::And);
        }
        if rest.starts_with(OR) {
            if !disjunction_allowed {
                return Err(ParseError::NotDisjunctiveNormalForm(text.to_string()));
            }
            return split(text, pos, Operator::Or);
        }
    }

    if depth != 0 {
        return Err(ParseError::UnbalancedParentheses(text.to_string()));
    }

    parse_literal(text, braces_present).map(RuleNode::Literal)
}

fn split(text: &str, pos: usize, operator: Operator) -> Result<RuleNode, ParseError> {
    // The operator sits at depth 1, so the subexpression must be fully
    // wrapped by the parentheses that opened that level.
    if !text.starts_with('(') || !text.ends_with(')') {
        return Err(ParseError::MalformedSubexpression(text.to_string()));
    }

    let left = &text[1..pos];
    let right = &text[pos + operator.keyword().len()..text.len() - 1];

    trace!(left, right, ?operator, "Splitting rule subexpression");

    // Children of AND may not contain OR; children of OR may.
    let children_allow_or = operator == Operator::Or;
    let left = parse_node(left, children_allow_or)?;
    let right = parse_node(right, children_allow_or)?;

    Ok(match operator {
        Operator::And => RuleNode::And(Box::new(left), Box::new(right)),
        Operator::Or => RuleNode::Or(Box::new(left), Box::new(right)),
    })
}

fn parse_literal(text: &str, braces_present: bool) -> Result<LiteralToken, ParseError> {
    let unwrapped: String = if braces_present {
        text.chars().filter(|c| *c != '(' && *c != ')').collect()
    } else {
        text.to_string()
    };

    let (negation, body) = match unwrapped.strip_prefix(NEGATION_MARKER) {
        Some(rest) => (true, rest),
        None => (false, unwrapped.as_str()),
    };

    if body.is_empty() {
        return Err(ParseError::EmptyLiteral(text.to_string()));
    }

    Ok(LiteralToken {
        negation,
        text: body.to_string(),
    })
}
