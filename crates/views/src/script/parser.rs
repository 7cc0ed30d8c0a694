//! Recursive-descent parser producing the map-function syntax tree.

use super::ScriptError;
use super::lexer::{Spanned, Token, tokenize};
use super::value::Value;

/// Maximum syntactic nesting of statements and expressions.
pub const MAX_DEPTH: usize = 128;

const RESERVED: &[&str] = &[
    "var", "let", "const", "if", "else", "for", "while", "break", "continue", "return", "throw",
    "function", "typeof", "true", "false", "null", "undefined",
];

/// A parsed map function: one optional parameter and a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub param: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Declare(Vec<(String, Option<Expr>)>),
    Expr(Expr),
    Block(Vec<Stmt>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf(String, Expr, Box<Stmt>),
    ForIn(String, Expr, Box<Stmt>),
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Expr),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign(AssignOp, Box<Expr>, Box<Expr>),
}

/// Parses a complete map-function source.
///
/// Accepted forms: `function [name](param) {..}`, `(param) => {..}` and
/// `param => {..}`, optionally wrapped in parentheses.
pub fn parse_function(src: &str) -> Result<Function, ScriptError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        depth: 0,
    };
    let wrapped = parser.is_punct("(") && parser.peek_is_ident_at(1, "function");
    if wrapped {
        parser.advance();
    }
    let function = parser.function()?;
    if wrapped {
        parser.expect("(", ")")?;
    }
    parser.eat(";");
    if parser.peek() != &Token::Eof {
        return Err(parser.error("unexpected input after function"));
    }
    Ok(function)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn peek_is_ident_at(&self, offset: usize, name: &str) -> bool {
        matches!(self.peek_at(offset), Token::Ident(n) if n == name)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Token::Punct(q) if *q == p)
    }

    fn is_keyword(&self, k: &str) -> bool {
        self.peek_is_ident_at(0, k)
    }

    fn eat(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, k: &str) -> bool {
        if self.is_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    // `context` is only used to make error messages readable.
    fn expect(&mut self, context: &str, p: &str) -> Result<(), ScriptError> {
        if self.eat(p) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{p}' after '{context}'")))
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        let spanned = &self.tokens[self.pos];
        ScriptError::Syntax {
            line: spanned.line,
            column: spanned.column,
            message: message.into(),
        }
    }

    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ScriptError::NestingTooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn binding_name(&mut self) -> Result<String, ScriptError> {
        match self.peek().clone() {
            Token::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn function(&mut self) -> Result<Function, ScriptError> {
        if self.eat_keyword("function") {
            if matches!(self.peek(), Token::Ident(_)) {
                self.binding_name()?;
            }
            self.expect("function", "(")?;
            let param = self.optional_param()?;
            self.expect("parameter list", ")")?;
            let body = self.block_body()?;
            return Ok(Function { param, body });
        }

        let param = if self.eat("(") {
            let param = self.optional_param()?;
            self.expect("parameter list", ")")?;
            param
        } else {
            Some(self.binding_name()?)
        };
        self.expect("parameter list", "=>")?;
        let body = if self.is_punct("{") {
            self.block_body()?
        } else {
            vec![Stmt::Expr(self.expression()?)]
        };
        Ok(Function { param, body })
    }

    fn optional_param(&mut self) -> Result<Option<String>, ScriptError> {
        if self.is_punct(")") {
            Ok(None)
        } else {
            self.binding_name().map(Some)
        }
    }

    fn block_body(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect("function header", "{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.peek() == &Token::Eof {
                return Err(self.error("unexpected end of input, expected '}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.leave();
        stmt
    }

    fn statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        if self.eat(";") {
            return Ok(Stmt::Empty);
        }
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block_body()?));
        }
        if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
            let decl = self.declaration()?;
            self.eat(";");
            return Ok(decl);
        }
        if self.eat_keyword("if") {
            self.expect("if", "(")?;
            let test = self.expression()?;
            self.expect("condition", ")")?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.eat_keyword("else") {
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If(test, then, otherwise));
        }
        if self.eat_keyword("while") {
            self.expect("while", "(")?;
            let test = self.expression()?;
            self.expect("condition", ")")?;
            return Ok(Stmt::While(test, Box::new(self.statement()?)));
        }
        if self.eat_keyword("for") {
            return self.for_statement();
        }
        if self.eat_keyword("break") {
            self.eat(";");
            return Ok(Stmt::Break);
        }
        if self.eat_keyword("continue") {
            self.eat(";");
            return Ok(Stmt::Continue);
        }
        if self.eat_keyword("return") {
            let value = if self.is_punct(";") || self.is_punct("}") {
                None
            } else {
                Some(self.expression()?)
            };
            self.eat(";");
            return Ok(Stmt::Return(value));
        }
        if self.eat_keyword("throw") {
            let value = self.expression()?;
            self.eat(";");
            return Ok(Stmt::Throw(value));
        }

        let expr = self.expression()?;
        self.eat(";");
        Ok(Stmt::Expr(expr))
    }

    fn declaration(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        let mut bindings = Vec::new();
        loop {
            let name = self.binding_name()?;
            let init = if self.eat("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            bindings.push((name, init));
            if !self.eat(",") {
                break;
            }
        }
        Ok(Stmt::Declare(bindings))
    }

    fn for_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.expect("for", "(")?;

        // for ([var|let|const] x of|in expr)
        let declared = self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const");
        let name_offset = usize::from(declared);
        let iteration = match self.peek_at(name_offset + 1) {
            Token::Ident(kw) if kw == "of" || kw == "in" => Some(kw == "of"),
            _ => None,
        };
        if let Some(is_of) = iteration
            && matches!(self.peek_at(name_offset), Token::Ident(_))
        {
            if declared {
                self.advance();
            }
            let name = self.binding_name()?;
            self.advance();
            let source = self.expression()?;
            self.expect("loop header", ")")?;
            let body = Box::new(self.statement()?);
            return Ok(if is_of {
                Stmt::ForOf(name, source, body)
            } else {
                Stmt::ForIn(name, source, body)
            });
        }

        let init = if self.is_punct(";") {
            None
        } else if declared {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect("loop initializer", ";")?;
        let test = if self.is_punct(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect("loop condition", ";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect("loop header", ")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let expr = self.assignment();
        self.leave();
        expr
    }

    fn assignment(&mut self) -> Result<Expr, ScriptError> {
        let target = self.conditional()?;
        let op = if self.eat("=") {
            AssignOp::Set
        } else if self.eat("+=") {
            AssignOp::Add
        } else if self.eat("-=") {
            AssignOp::Sub
        } else {
            return Ok(target);
        };
        if !matches!(target, Expr::Ident(_) | Expr::Member(..)) {
            return Err(self.error("invalid assignment target"));
        }
        let value = self.expression()?;
        Ok(Expr::Assign(op, Box::new(target), Box::new(value)))
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let test = self.logical_or()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let then = self.expression()?;
        self.expect("conditional branch", ":")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn logical_or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.logical_and()?;
        while self.eat("||") {
            let right = self.logical_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.equality()?;
        while self.eat("&&") {
            let right = self.equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ScriptError>,
    ) -> Result<Expr, ScriptError> {
        let mut left = next(self)?;
        'outer: loop {
            for (punct, op) in ops {
                if self.eat(punct) {
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = if self.eat("!") {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Neg
        } else if self.eat("+") {
            UnaryOp::Plus
        } else if self.eat_keyword("typeof") {
            UnaryOp::TypeOf
        } else if self.is_punct("++") || self.is_punct("--") {
            let increment = self.advance() == Token::Punct("++");
            self.enter()?;
            let target = self.unary();
            self.leave();
            return self.update(increment, true, target?);
        } else {
            return self.postfix();
        };
        self.enter()?;
        let operand = self.unary();
        self.leave();
        Ok(Expr::Unary(op, Box::new(operand?)))
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.call_member()?;
        if self.is_punct("++") || self.is_punct("--") {
            let increment = self.advance() == Token::Punct("++");
            return self.update(increment, false, expr);
        }
        Ok(expr)
    }

    fn update(&self, increment: bool, prefix: bool, target: Expr) -> Result<Expr, ScriptError> {
        if !matches!(target, Expr::Ident(_) | Expr::Member(..)) {
            return Err(self.error("invalid increment/decrement target"));
        }
        Ok(Expr::Update {
            increment,
            prefix,
            target: Box::new(target),
        })
    }

    fn call_member(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                let name = match self.advance() {
                    Token::Ident(name) => name,
                    _ => return Err(self.error("expected property name after '.'")),
                };
                expr = Expr::Member(Box::new(expr), Box::new(Expr::Literal(Value::String(name))));
            } else if self.eat("[") {
                let property = self.expression()?;
                self.expect("computed property", "]")?;
                expr = Expr::Member(Box::new(expr), Box::new(property));
            } else if self.eat("(") {
                let mut args = Vec::new();
                while !self.is_punct(")") {
                    args.push(self.expression()?);
                    if !self.eat(",") {
                        break;
                    }
                }
                self.expect("argument list", ")")?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "undefined" => Ok(Expr::Literal(Value::Undefined)),
                reserved if RESERVED.contains(&reserved) => {
                    Err(self.error(format!("unexpected keyword '{reserved}'")))
                }
                _ => Ok(Expr::Ident(name)),
            },
            Token::Punct("(") => {
                let expr = self.expression()?;
                self.expect("expression", ")")?;
                Ok(expr)
            }
            Token::Punct("[") => {
                let mut items = Vec::new();
                while !self.is_punct("]") {
                    items.push(self.expression()?);
                    if !self.eat(",") {
                        break;
                    }
                }
                self.expect("array literal", "]")?;
                Ok(Expr::Array(items))
            }
            Token::Punct("{") => {
                let mut fields = Vec::new();
                while !self.is_punct("}") {
                    let key = match self.advance() {
                        Token::Ident(name) | Token::Str(name) => name,
                        Token::Number(n) => super::value::format_number(n),
                        _ => return Err(self.error("expected property name")),
                    };
                    self.expect("property name", ":")?;
                    fields.push((key, self.expression()?));
                    if !self.eat(",") {
                        break;
                    }
                }
                self.expect("object literal", "}")?;
                Ok(Expr::Object(fields))
            }
            Token::Eof => Err(self.error("unexpected end of input")),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_classic_map_function() {
        let f = parse_function("function(doc){emit(doc.type, doc._id)}").unwrap();
        assert_eq!(f.param.as_deref(), Some("doc"));
        assert_eq!(f.body.len(), 1);
        assert!(matches!(&f.body[0], Stmt::Expr(Expr::Call(callee, args))
            if **callee == Expr::Ident("emit".into()) && args.len() == 2));
    }

    #[test]
    fn parses_named_and_arrow_forms() {
        assert!(parse_function("function map(doc) { }").is_ok());
        assert!(parse_function("(doc) => { emit(doc._id, 1); }").is_ok());
        assert!(parse_function("doc => emit(doc._id, 1)").is_ok());
        assert!(parse_function("(function (doc) { emit(1, 2) });").is_ok());
    }

    #[test]
    fn respects_operator_precedence() {
        let f = parse_function("function(d){ x = 1 + 2 * 3 }").unwrap();
        let Stmt::Expr(Expr::Assign(_, _, value)) = &f.body[0] else {
            panic!("expected assignment");
        };
        let Expr::Binary(BinaryOp::Add, _, right) = value.as_ref() else {
            panic!("expected addition at the top");
        };
        assert!(matches!(right.as_ref(), Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn parses_loops() {
        let src = r#"
            function(doc) {
                for (var i = 0; i < doc.tags.length; i++) { emit(doc.tags[i], null) }
                for (const t of doc.tags) emit(t, 1);
                for (let k in doc) { if (k === "x") continue; }
                while (false) break;
            }
        "#;
        let f = parse_function(src).unwrap();
        assert!(matches!(f.body[0], Stmt::For { .. }));
        assert!(matches!(f.body[1], Stmt::ForOf(..)));
        assert!(matches!(f.body[2], Stmt::ForIn(..)));
        assert!(matches!(f.body[3], Stmt::While(..)));
    }

    #[test]
    fn rejects_trailing_garbage_and_bad_syntax() {
        assert!(parse_function("function(doc){} extra").is_err());
        assert!(parse_function("function(doc){ emit(").is_err());
        assert!(parse_function("function(doc){ 1 = 2 }").is_err());
        assert!(parse_function("not a function").is_err());
    }

    #[test]
    fn bounds_nesting_depth() {
        let src = format!("function(d){{ x = {}1{} }}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(
            parse_function(&src),
            Err(ScriptError::NestingTooDeep(_))
        ));
    }
}
