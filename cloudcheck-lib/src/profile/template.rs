//! `#{...}` placeholder substitution over profile templates.
//!
//! Two forms are supported inside a placeholder: a bare input name
//! (`#{project}`), and a comparison of two operands (`#{environment == 'prod'}`,
//! `#{environment != staging}`) rendering "true" or "false". Operands are
//! input names or single/double-quoted literals. Substitution runs exactly
//! once, at bind time; referencing an input with no value is fatal.

use crate::Result;
use ohno::app_err;
use std::collections::BTreeMap;

/// Substitute every `#{...}` placeholder in `template` from `inputs`.
pub fn substitute(template: &str, inputs: &BTreeMap<String, String>) -> Result<String> {
    let Some(first) = template.find("#{") else {
        return Ok(template.to_string());
    };

    let mut out = String::with_capacity(template.len());
    out.push_str(&template[..first]);
    let mut rest = &template[first..];

    while let Some(start) = rest.find("#{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(app_err!("unterminated placeholder in template '{template}'"));
        };
        out.push_str(&eval_expression(&after[..end], inputs)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn eval_expression(expression: &str, inputs: &BTreeMap<String, String>) -> Result<String> {
    if let Some((lhs, rhs)) = split_operator(expression, "==") {
        let equal = operand(lhs, inputs)? == operand(rhs, inputs)?;
        return Ok(equal.to_string());
    }
    if let Some((lhs, rhs)) = split_operator(expression, "!=") {
        let equal = operand(lhs, inputs)? == operand(rhs, inputs)?;
        return Ok((!equal).to_string());
    }
    operand(expression, inputs)
}

fn split_operator<'a>(expression: &'a str, operator: &str) -> Option<(&'a str, &'a str)> {
    expression.split_once(operator)
}

fn operand(token: &str, inputs: &BTreeMap<String, String>) -> Result<String> {
    let token = token.trim();
    for quote in ['\'', '"'] {
        if let Some(stripped) = token.strip_prefix(quote) {
            let Some(literal) = stripped.strip_suffix(quote) else {
                return Err(app_err!("unterminated literal {token} in template expression"));
            };
            return Ok(literal.to_string());
        }
    }

    inputs
        .get(token)
        .cloned()
        .ok_or_else(|| app_err!("unbound input '{token}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("project".to_string(), "acme".to_string()),
            ("environment".to_string(), "prod".to_string()),
        ])
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(substitute("aws_vpc", &inputs()).unwrap(), "aws_vpc");
    }

    #[test]
    fn single_placeholder() {
        assert_eq!(substitute("#{project}", &inputs()).unwrap(), "acme");
    }

    #[test]
    fn interleaved_placeholders() {
        assert_eq!(substitute("#{project}-#{environment}-db", &inputs()).unwrap(), "acme-prod-db");
    }

    #[test]
    fn equality_against_literal() {
        assert_eq!(substitute("#{environment == 'prod'}", &inputs()).unwrap(), "true");
        assert_eq!(substitute("#{environment == 'dev'}", &inputs()).unwrap(), "false");
        assert_eq!(substitute("#{environment != \"dev\"}", &inputs()).unwrap(), "true");
    }

    #[test]
    fn equality_between_inputs() {
        let mut inputs = inputs();
        let _ = inputs.insert("expected".to_string(), "prod".to_string());
        assert_eq!(substitute("#{environment == expected}", &inputs).unwrap(), "true");
    }

    #[test]
    fn unbound_input_is_fatal() {
        let err = substitute("#{project}-#{region}", &inputs()).unwrap_err();
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn unterminated_placeholder_is_fatal() {
        let _ = substitute("#{project", &inputs()).unwrap_err();
    }

    #[test]
    fn unterminated_literal_is_fatal() {
        let _ = substitute("#{environment == 'prod}", &inputs()).unwrap_err();
    }
}
