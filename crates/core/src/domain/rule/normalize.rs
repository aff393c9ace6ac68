//! Flattening of the operator tree into disjunctive normal form
//!
//! `OR` nodes contribute their children's conjunctions in source order, an
//! `AND` subtree becomes one conjunction holding all of its leaves.

use super::parser::{LiteralToken, RuleNode};
use super::{Conjunction, Expression, Literal, ParseError, Predicate};
use crate::domain::stream::Direction;

const PROPERTY_KEYWORD: &str = "property";
const DIRECTION_KEYWORD: &str = "direction";

/// Normalize a parsed tree into an [`Expression`]
pub fn normalize(tree: &RuleNode) -> Result<Expression, ParseError> {
    let mut conjunctions = Vec::new();
    gather_expression(tree, &mut conjunctions)?;
    Ok(Expression { conjunctions })
}

fn gather_expression(node: &RuleNode, out: &mut Vec<Conjunction>) -> Result<(), ParseError> {
    match node {
        RuleNode::Or(left, right) => {
            gather_expression(left, out)?;
            gather_expression(right, out)
        }
        other => {
            let mut literals = Vec::new();
            gather_conjunction(other, &mut literals)?;
            out.push(Conjunction { literals });
            Ok(())
        }
    }
}

fn gather_conjunction(node: &RuleNode, out: &mut Vec<Literal>) -> Result<(), ParseError> {
    match node {
        RuleNode::And(left, right) => {
            gather_conjunction(left, out)?;
            gather_conjunction(right, out)
        }
        RuleNode::Literal(token) => {
            out.push(compile_literal(token)?);
            Ok(())
        }
        // The parser never produces this, a hand-built tree might.
        RuleNode::Or(_, _) => Err(ParseError::NotDisjunctiveNormalForm(
            "OR below AND".to_string(),
        )),
    }
}

/// Compile raw literal text into a typed predicate
pub fn compile_literal(token: &LiteralToken) -> Result<Literal, ParseError> {
    let text = token.text.as_str();

    let predicate = if let Some(pair) = text.strip_prefix(PROPERTY_KEYWORD) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| ParseError::MissingPropertySeparator(text.to_string()))?;
        Predicate::Property {
            name: name.to_string(),
            value: value.to_string(),
        }
    } else if let Some(value) = text.strip_prefix(DIRECTION_KEYWORD) {
        let expected = value
            .parse::<Direction>()
            .map_err(|_| ParseError::UnknownDirection(value.to_string()))?;
        Predicate::Direction { expected }
    } else {
        return Err(ParseError::UnknownPredicate(text.to_string()));
    };

    Ok(Literal {
        predicate,
        negation: token.negation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::parser::parse;

    fn token(text: &str) -> LiteralToken {
        LiteralToken {
            negation: false,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_compile_property_literal() {
        let literal = compile_literal(&token("propertymedia.role=music")).unwrap();
        assert_eq!(
            literal.predicate,
            Predicate::Property {
                name: "media.role".to_string(),
                value: "music".to_string(),
            }
        );
        assert!(!literal.negation);
    }

    #[test]
    fn test_property_value_split_at_first_equals() {
        let literal = compile_literal(&token("propertya=b=c")).unwrap();
        assert_eq!(
            literal.predicate,
            Predicate::Property {
                name: "a".to_string(),
                value: "b=c".to_string(),
            }
        );
    }

    #[test]
    fn test_compile_direction_literal() {
        let literal = compile_literal(&LiteralToken {
            negation: true,
            text: "directioninput".to_string(),
        })
        .unwrap();
        assert_eq!(
            literal.predicate,
            Predicate::Direction {
                expected: Direction::Input
            }
        );
        assert!(literal.negation);
    }

    #[test]
    fn test_literal_errors() {
        assert!(matches!(
            compile_literal(&token("propertyfoo")),
            Err(ParseError::MissingPropertySeparator(_))
        ));
        assert!(matches!(
            compile_literal(&token("directionsideways")),
            Err(ParseError::UnknownDirection(_))
        ));
        assert!(matches!(
            compile_literal(&token("directioninputs")),
            Err(ParseError::UnknownDirection(_))
        ));
        assert!(matches!(
            compile_literal(&token("media.role=music")),
            Err(ParseError::UnknownPredicate(_))
        ));
    }

    #[test]
    fn test_or_chain_keeps_source_order() {
        let tree = parse("(property a=1 OR (property b=2 OR property c=3))").unwrap();
        let expression = normalize(&tree).unwrap();

        let names: Vec<_> = expression
            .conjunctions()
            .iter()
            .map(|c| match &c.literals()[0].predicate {
                Predicate::Property { name, .. } => name.clone(),
                other => panic!("unexpected predicate {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_and_subtree_becomes_one_conjunction() {
        let tree = parse("((property a=1 AND property b=2) AND direction output)").unwrap();
        let expression = normalize(&tree).unwrap();

        assert_eq!(expression.conjunctions().len(), 1);
        let literals = expression.conjunctions()[0].literals();
        assert_eq!(literals.len(), 3);
        assert_eq!(
            literals[2].predicate,
            Predicate::Direction {
                expected: Direction::Output
            }
        );
    }

    #[test]
    fn test_hand_built_or_below_and_rejected() {
        let leaf = || Box::new(RuleNode::Literal(token("directioninput")));
        let tree = RuleNode::And(leaf(), Box::new(RuleNode::Or(leaf(), leaf())));
        assert!(matches!(
            normalize(&tree),
            Err(ParseError::NotDisjunctiveNormalForm(_))
        ));
    }
}
