//! Recursive descent parser with a single token of lookahead.

use crate::error::CompileError;
use crate::parsing::{Error, ErrorExt, TokenStream};

use super::ast::{BinaryOp, Expression, ForInit, Function, Program, Statement, StepOp, Type};
use super::token::{tokenize, Keyword, Operator, Punctuation, Token, TokenKind};
use super::SyntaxError;

fn punct(punctuation: Punctuation) -> TokenKind {
    TokenKind::Punctuation(punctuation)
}

fn keyword(keyword: Keyword) -> TokenKind {
    TokenKind::Keyword(keyword)
}

fn peek_is(stream: &TokenStream, kind: &TokenKind) -> bool {
    stream.peek_kind() == Some(kind)
}

fn peek_operator(stream: &TokenStream) -> Option<Operator> {
    match stream.peek_kind() {
        Some(TokenKind::Operator(op)) => Some(*op),
        _ => None,
    }
}

/// Parses a complete program from a token sequence.
pub fn parse(tokens: &[Token]) -> Result<Program, SyntaxError> {
    let mut stream = TokenStream::from(tokens);
    let mut functions = Vec::new();

    while !stream.is_empty() {
        functions.push(parse_function(&mut stream)?);
    }

    Ok(Program { functions })
}

impl Program {
    /// Tokenizes and parses source text.
    pub fn parse(source: &str) -> Result<Program, CompileError> {
        let tokens = tokenize(source)?;
        Ok(parse(&tokens)?)
    }
}

fn parse_function(stream: &mut TokenStream) -> Result<Function, SyntaxError> {
    let return_type = match stream.peek_kind() {
        Some(TokenKind::Keyword(Keyword::Int)) => Type::Int,
        Some(TokenKind::Keyword(Keyword::Void)) => Type::Void,
        _ => return Err(stream.unexpected("a function definition")),
    };

    stream.next();

    let name = stream.expect_identifier("a function name")?;

    let body = parse_function_rest(stream)
        .context(format!("function `{}`", name))?;

    Ok(Function {
        return_type,
        name,
        body,
    })
}

fn parse_function_rest(stream: &mut TokenStream) -> Result<Vec<Statement>, SyntaxError> {
    stream.expect(&punct(Punctuation::OpenParen), "`(`")?;

    // Parameters are not supported, anything up to the closing parenthesis is dropped.
    while let Some(kind) = stream.peek_kind() {
        if *kind == punct(Punctuation::CloseParen) {
            break;
        }

        stream.next();
    }

    stream.expect(&punct(Punctuation::CloseParen), "`)`")?;

    parse_block(stream)
}

fn parse_block(stream: &mut TokenStream) -> Result<Vec<Statement>, SyntaxError> {
    stream.expect(&punct(Punctuation::OpenBrace), "`{`")?;

    let mut body = Vec::new();

    loop {
        match stream.peek_kind() {
            Some(TokenKind::Punctuation(Punctuation::CloseBrace)) => {
                stream.next();
                return Ok(body);
            },
            None => return Err(Error::eos("`}`")),
            Some(_) => body.push(parse_statement(stream)?),
        }
    }
}

/// Either a braced block or a single statement.
fn parse_body(stream: &mut TokenStream) -> Result<Vec<Statement>, SyntaxError> {
    if peek_is(stream, &punct(Punctuation::OpenBrace)) {
        parse_block(stream)
    } else {
        Ok(vec![parse_statement(stream)?])
    }
}

fn parse_statement(stream: &mut TokenStream) -> Result<Statement, SyntaxError> {
    match stream.peek_kind() {
        Some(TokenKind::Keyword(Keyword::Int)) => parse_declaration(stream).context("declaration"),
        Some(TokenKind::Keyword(Keyword::If)) => parse_if(stream).context("if statement"),
        Some(TokenKind::Keyword(Keyword::While)) => parse_while(stream).context("while statement"),
        Some(TokenKind::Keyword(Keyword::For)) => parse_for(stream).context("for statement"),
        Some(TokenKind::Keyword(Keyword::Return)) => parse_return(stream).context("return statement"),
        _ => parse_expression_statement(stream),
    }
}

/// `int name [= value];`
fn parse_declarator(stream: &mut TokenStream) -> Result<(String, Option<Expression>), SyntaxError> {
    stream.expect(&keyword(Keyword::Int), "`int`")?;

    let name = stream.expect_identifier("a variable name")?;

    let init = if stream.assert(&TokenKind::Operator(Operator::Assign)) {
        Some(parse_expression(stream)?)
    } else {
        None
    };

    stream.expect(&punct(Punctuation::Semicolon), "`;`")?;

    Ok((name, init))
}

fn parse_declaration(stream: &mut TokenStream) -> Result<Statement, SyntaxError> {
    let (name, init) = parse_declarator(stream)?;

    Ok(Statement::Declaration { name, init })
}

fn parse_condition(stream: &mut TokenStream) -> Result<Expression, SyntaxError> {
    stream.expect(&punct(Punctuation::OpenParen), "`(`")?;
    let condition = parse_expression(stream)?;
    stream.expect(&punct(Punctuation::CloseParen), "`)`")?;

    Ok(condition)
}

fn parse_if(stream: &mut TokenStream) -> Result<Statement, SyntaxError> {
    stream.expect(&keyword(Keyword::If), "`if`")?;

    let condition = parse_condition(stream)?;
    let then_body = parse_body(stream)?;

    let else_body = if stream.assert(&keyword(Keyword::Else)) {
        Some(parse_body(stream).context("else branch")?)
    } else {
        None
    };

    Ok(Statement::If {
        condition,
        then_body,
        else_body,
    })
}

fn parse_while(stream: &mut TokenStream) -> Result<Statement, SyntaxError> {
    stream.expect(&keyword(Keyword::While), "`while`")?;

    let condition = parse_condition(stream)?;
    let body = parse_body(stream)?;

    Ok(Statement::While { condition, body })
}

fn parse_for(stream: &mut TokenStream) -> Result<Statement, SyntaxError> {
    stream.expect(&keyword(Keyword::For), "`for`")?;
    stream.expect(&punct(Punctuation::OpenParen), "`(`")?;

    let semicolon = punct(Punctuation::Semicolon);

    let init = if stream.assert(&semicolon) {
        None
    } else if peek_is(stream, &keyword(Keyword::Int)) {
        let (name, init) = parse_declarator(stream)?;
        Some(ForInit::Declaration { name, init })
    } else {
        let expr = parse_expression(stream)?;
        stream.expect(&semicolon, "`;`")?;
        Some(ForInit::Expression(expr))
    };

    let condition = match peek_is(stream, &semicolon) {
        true => None,
        false => Some(parse_expression(stream)?),
    };

    stream.expect(&semicolon, "`;`")?;

    let update = match peek_is(stream, &punct(Punctuation::CloseParen)) {
        true => None,
        false => Some(parse_expression(stream)?),
    };

    stream.expect(&punct(Punctuation::CloseParen), "`)`")?;

    let body = parse_body(stream)?;

    Ok(Statement::For {
        init,
        condition,
        update,
        body,
    })
}

fn parse_return(stream: &mut TokenStream) -> Result<Statement, SyntaxError> {
    stream.expect(&keyword(Keyword::Return), "`return`")?;

    let value = match peek_is(stream, &punct(Punctuation::Semicolon)) {
        true => None,
        false => Some(parse_expression(stream)?),
    };

    stream.expect(&punct(Punctuation::Semicolon), "`;`")?;

    Ok(Statement::Return(value))
}

fn parse_expression_statement(stream: &mut TokenStream) -> Result<Statement, SyntaxError> {
    let expr = parse_expression(stream)?;
    stream.expect(&punct(Punctuation::Semicolon), "`;`")?;

    Ok(Statement::Expression(expr))
}

/// Assignment, the loosest binding and the only right associative operator.
pub(crate) fn parse_expression(stream: &mut TokenStream) -> Result<Expression, SyntaxError> {
    let target = parse_comparison(stream)?;

    if stream.assert(&TokenKind::Operator(Operator::Assign)) {
        let value = parse_expression(stream)?;
        return Ok(Expression::assign(target, value));
    }

    Ok(target)
}

fn comparison_op(op: Operator) -> Option<BinaryOp> {
    match op {
        Operator::Less => Some(BinaryOp::Less),
        Operator::Greater => Some(BinaryOp::Greater),
        Operator::Equal => Some(BinaryOp::Equal),
        Operator::NotEqual => Some(BinaryOp::NotEqual),
        Operator::LessEqual => Some(BinaryOp::LessEqual),
        Operator::GreaterEqual => Some(BinaryOp::GreaterEqual),
        _ => None,
    }
}

fn additive_op(op: Operator) -> Option<BinaryOp> {
    match op {
        Operator::Plus => Some(BinaryOp::Add),
        Operator::Minus => Some(BinaryOp::Subtract),
        _ => None,
    }
}

fn multiplicative_op(op: Operator) -> Option<BinaryOp> {
    match op {
        Operator::Star => Some(BinaryOp::Multiply),
        Operator::Slash => Some(BinaryOp::Divide),
        Operator::Percent => Some(BinaryOp::Modulo),
        _ => None,
    }
}

/// Parses a left associative chain of operands joined by the operators `select` accepts.
fn parse_left_fold<O, S>(
    stream: &mut TokenStream,
    select: S,
    operand: O,
) -> Result<Expression, SyntaxError>
where
    S: Fn(Operator) -> Option<BinaryOp>,
    O: Fn(&mut TokenStream) -> Result<Expression, SyntaxError>,
{
    let mut left = operand(stream)?;

    while let Some(op) = peek_operator(stream).and_then(&select) {
        stream.next();
        let right = operand(stream)?;
        left = Expression::binary(op, left, right);
    }

    Ok(left)
}

fn parse_comparison(stream: &mut TokenStream) -> Result<Expression, SyntaxError> {
    parse_left_fold(stream, comparison_op, parse_additive)
}

fn parse_additive(stream: &mut TokenStream) -> Result<Expression, SyntaxError> {
    parse_left_fold(stream, additive_op, parse_multiplicative)
}

fn parse_multiplicative(stream: &mut TokenStream) -> Result<Expression, SyntaxError> {
    parse_left_fold(stream, multiplicative_op, parse_unary)
}

fn step_op(op: Operator) -> Option<StepOp> {
    match op {
        Operator::Increment => Some(StepOp::Increment),
        Operator::Decrement => Some(StepOp::Decrement),
        _ => None,
    }
}

fn parse_unary(stream: &mut TokenStream) -> Result<Expression, SyntaxError> {
    if let Some(op) = peek_operator(stream).and_then(step_op) {
        stream.next();
        let operand = parse_primary(stream)?;

        return Ok(Expression::PreOp {
            op,
            operand: Box::new(operand),
        });
    }

    let expr = parse_primary(stream)?;

    if let Some(op) = peek_operator(stream).and_then(step_op) {
        stream.next();

        return Ok(Expression::PostOp {
            op,
            operand: Box::new(expr),
        });
    }

    Ok(expr)
}

fn parse_primary(stream: &mut TokenStream) -> Result<Expression, SyntaxError> {
    let token = match stream.peek() {
        Some(token) => token,
        None => return Err(Error::eos("an expression")),
    };

    match &token.kind {
        TokenKind::Number(value) => {
            stream.next();
            Ok(Expression::Number(*value))
        },
        TokenKind::String(text) => {
            stream.next();
            Ok(Expression::String(text.clone()))
        },
        TokenKind::Identifier(name) => {
            stream.next();

            if peek_is(stream, &punct(Punctuation::OpenParen)) {
                let args = parse_arguments(stream)
                    .context(format!("call to `{}`", name))?;

                return Ok(Expression::Call {
                    name: name.clone(),
                    args,
                });
            }

            Ok(Expression::Variable(name.clone()))
        },
        TokenKind::Punctuation(Punctuation::OpenParen) => {
            stream.next();
            let expr = parse_expression(stream)?;
            stream.expect(&punct(Punctuation::CloseParen), "`)`")?;
            Ok(expr)
        },
        _ => Err(Error::unexpected(token, "an expression")),
    }
}

fn parse_arguments(stream: &mut TokenStream) -> Result<Vec<Expression>, SyntaxError> {
    stream.expect(&punct(Punctuation::OpenParen), "`(`")?;

    let mut args = Vec::new();

    if !peek_is(stream, &punct(Punctuation::CloseParen)) {
        args.push(parse_expression(stream)?);

        while stream.assert(&punct(Punctuation::Comma)) {
            args.push(parse_expression(stream)?);
        }
    }

    stream.expect(&punct(Punctuation::CloseParen), "`)`")?;

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ErrorKind;

    fn parse_str(source: &str) -> Result<Program, SyntaxError> {
        parse(&tokenize(source).expect("could not tokenize"))
    }

    fn parse_expr(source: &str) -> Expression {
        let tokens = tokenize(source).expect("could not tokenize");
        let mut stream = TokenStream::from(&tokens[..]);
        let expr = parse_expression(&mut stream).expect("could not parse");
        assert!(stream.is_empty());
        expr
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("x = a + b * c < d - e");

        let expected = Expression::assign(
            Expression::variable("x"),
            Expression::binary(
                BinaryOp::Less,
                Expression::binary(
                    BinaryOp::Add,
                    Expression::variable("a"),
                    Expression::binary(BinaryOp::Multiply, Expression::variable("b"), Expression::variable("c")),
                ),
                Expression::binary(BinaryOp::Subtract, Expression::variable("d"), Expression::variable("e")),
            ),
        );

        assert_eq!(expr, expected);
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b = 3");

        assert_eq!(expr, Expression::assign(
            Expression::variable("a"),
            Expression::assign(Expression::variable("b"), Expression::Number(3)),
        ));
    }

    #[test]
    fn test_subtraction_folds_left() {
        let expr = parse_expr("10 - 4 - 3");

        assert_eq!(expr, Expression::binary(
            BinaryOp::Subtract,
            Expression::binary(BinaryOp::Subtract, Expression::Number(10), Expression::Number(4)),
            Expression::Number(3),
        ));
    }

    #[test]
    fn test_step_operators() {
        assert_eq!(parse_expr("++i"), Expression::PreOp {
            op: StepOp::Increment,
            operand: Box::new(Expression::variable("i")),
        });

        assert_eq!(parse_expr("i-- * 2"), Expression::binary(
            BinaryOp::Multiply,
            Expression::PostOp {
                op: StepOp::Decrement,
                operand: Box::new(Expression::variable("i")),
            },
            Expression::Number(2),
        ));
    }

    #[test]
    fn test_function_parameters_are_skipped() {
        let program = parse_str("void helper(int a, int b) { return; } int main() { helper(1, 2); }")
            .expect("could not parse");

        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[0].return_type, Type::Void);
        assert_eq!(program.functions[0].body, vec![Statement::Return(None)]);
        assert_eq!(program.functions[1].body, vec![Statement::Expression(Expression::Call {
            name: "helper".into(),
            args: vec![Expression::Number(1), Expression::Number(2)],
        })]);
    }

    #[test]
    fn test_dangling_else() {
        let program = parse_str("int main() { if (a) if (b) x = 1; else x = 2; }").unwrap();

        match &program.functions[0].body[0] {
            Statement::If { then_body, else_body: None, .. } => match &then_body[0] {
                Statement::If { else_body: Some(_), .. } => (),
                other => panic!("unexpected inner statement: {:?}", other),
            },
            other => panic!("unexpected outer statement: {:?}", other),
        }
    }

    #[test]
    fn test_for_clauses() {
        let program = parse_str("int main() { for (;;) x++; for (i = 0; i < 3;) { } }").unwrap();
        let body = &program.functions[0].body;

        assert_eq!(body[0], Statement::For {
            init: None,
            condition: None,
            update: None,
            body: vec![Statement::Expression(Expression::PostOp {
                op: StepOp::Increment,
                operand: Box::new(Expression::variable("x")),
            })],
        });

        match &body[1] {
            Statement::For { init: Some(init), condition: Some(_), update: None, body } => {
                assert_eq!(*init, ForInit::Expression(
                    Expression::assign(Expression::variable("i"), Expression::Number(0)),
                ));
                assert!(body.is_empty());
            },
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_error_reports_expected_and_found() {
        let err = parse_str("int main() {\n  int x = 1\n  return x;\n}").unwrap_err();

        assert_eq!(err.line(), Some(3));
        assert_eq!(
            err.to_string(),
            "line 3: function `main`: declaration: expected `;`, found keyword `return`",
        );
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let err = parse_str("int main() { while (1) {").unwrap_err();

        match err.kind {
            ErrorKind::EndOfStream { ref expected } => assert_eq!(expected, "`}`"),
            ref other => panic!("unexpected error kind: {:?}", other),
        }
    }

    #[test]
    fn test_top_level_must_be_function() {
        let err = parse_str("x = 1;").unwrap_err();
        assert_eq!(err.to_string(), "line 1: expected a function definition, found identifier `x`");
    }
}
