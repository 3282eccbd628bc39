// src/formula.rs
//
// Infix arithmetic formula evaluator (spec §4.2, C2). Two-stack shunting
// over whitespace-separated tokens — adjacency like "a+b" is not a valid
// token split, by design (spec §9, "Formula evaluator robustness").
// Configuration authors must whitespace-separate every token.

/// Anything that can resolve a bare field name to its current value.
/// Implemented by the simulation engine; kept as a trait here so the
/// evaluator has no dependency on engine internals and is unit-testable in
/// isolation.
pub trait FieldLookup {
    /// Returns 0.0 for an unknown name (spec §4.2, "Field-name resolution").
    fn lookup(&self, name: &str) -> f32;
}

fn precedence(op: char) -> u8 {
    match op {
        '*' | '/' => 2,
        '+' | '-' => 1,
        _ => 0,
    }
}

fn apply(op: char, a: f32, b: f32) -> f32 {
    match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        '/' => {
            if b != 0.0 {
                a / b
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn is_operator(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if "+-*/".contains(c) => Some(c),
        _ => None,
    }
}

fn token_value(token: &str, lookup: &dyn FieldLookup) -> f32 {
    let mut chars = token.chars();
    let first = chars.next();
    let starts_numeric = match first {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };
    if starts_numeric {
        token.parse::<f32>().unwrap_or(0.0)
    } else {
        lookup.lookup(token)
    }
}

/// Evaluates a whitespace-tokenized infix expression, resolving bare
/// identifiers against `lookup`. Division by zero yields 0; unmatched
/// parentheses are tolerated; commas are ignored; on operand exhaustion
/// evaluation stops early and returns whatever is on top of the value stack
/// (0 if empty) — spec §4.2, "Algorithm".
pub fn evaluate(formula: &str, lookup: &dyn FieldLookup) -> f32 {
    let mut values: Vec<f32> = Vec::new();
    let mut ops: Vec<char> = Vec::new();

    let pop_apply = |values: &mut Vec<f32>, op: char| {
        if values.len() < 2 {
            return;
        }
        let b = values.pop().unwrap();
        let a = values.pop().unwrap();
        values.push(apply(op, a, b));
    };

    for token in formula.split_whitespace() {
        if token == "," {
            continue;
        }

        if token == "(" {
            ops.push('(');
            continue;
        }

        if token == ")" {
            while let Some(&top) = ops.last() {
                if top == '(' {
                    break;
                }
                ops.pop();
                pop_apply(&mut values, top);
            }
            if ops.last() == Some(&'(') {
                ops.pop();
            }
            continue;
        }

        if let Some(op) = is_operator(token) {
            let prec = precedence(op);
            while let Some(&top) = ops.last() {
                if top == '(' || precedence(top) < prec {
                    break;
                }
                ops.pop();
                pop_apply(&mut values, top);
            }
            ops.push(op);
            continue;
        }

        values.push(token_value(token, lookup));
    }

    while let Some(op) = ops.pop() {
        if op == '(' {
            continue;
        }
        pop_apply(&mut values, op);
    }

    values.last().copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;
    impl FieldLookup for Empty {
        fn lookup(&self, _name: &str) -> f32 {
            0.0
        }
    }

    struct Map(Vec<(&'static str, f32)>);
    impl FieldLookup for Map {
        fn lookup(&self, name: &str) -> f32 {
            self.0
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
                .unwrap_or(0.0)
        }
    }

    #[test]
    fn precedence_is_honored() {
        assert_eq!(evaluate("1 + 2 * 3", &Empty), 7.0);
        assert_eq!(evaluate("( 1 + 2 ) * 3", &Empty), 9.0);
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(evaluate("10 / 0", &Empty), 0.0);
    }

    #[test]
    fn resolves_field_names() {
        let lookup = Map(vec![("temperature", 21.1)]);
        assert_eq!(evaluate("90.0 + ( temperature - 21.1 ) * 0.36", &lookup), 90.0);
    }

    #[test]
    fn unknown_field_is_zero() {
        assert_eq!(evaluate("missing_field + 5", &Empty), 5.0);
    }

    #[test]
    fn negative_literal() {
        assert_eq!(evaluate("-5 + 10", &Empty), 5.0);
    }

    #[test]
    fn commas_are_ignored() {
        assert_eq!(evaluate("1 , + 2", &Empty), 3.0);
    }

    #[test]
    fn unmatched_parens_tolerated() {
        assert_eq!(evaluate("( 1 + 2", &Empty), 3.0);
    }

    #[test]
    fn operand_exhaustion_returns_top() {
        assert_eq!(evaluate("+ 5", &Empty), 5.0);
    }
}
