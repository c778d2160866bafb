//! Recursive Descent Parser for recipe files
//!
//! This parser consumes tokens from the lexer and produces a [`Program`].
//! It uses two tokens of lookahead (current + peek) and never backtracks;
//! the first error aborts the parse.
//!
//! Grammar (simplified):
//!   program    ::= statement*
//!   statement  ::= assignment | include | rule
//!   assignment ::= "let" IDENT "=" value [cond]
//!   include    ::= "include" (value | list) [cond]
//!   rule       ::= IDENT ["triggered"] "{" [kv ("," kv)* [","]] "}"
//!   kv         ::= IDENT "=>" (value | list | call)
//!   cond       ::= ("if" | "unless") call
//!   call       ::= IDENT "(" [value ("," value)*] ")"

use indexmap::IndexMap;
use uuid::Uuid;

use crate::ast::{
    Assignment, Condition, ConditionKind, FunctionCall, Include, Node, Program, Rule, Value,
};
use crate::parser::lexer::{Lexer, Token, TokenKind};
use crate::parser::types::ParseError;

/// Parse a recipe source string into a program.
pub fn parse(input: &str) -> Result<Program, ParseError> {
    Parser::new(input).parse()
}

/// Main parser struct
pub struct Parser {
    lexer: Lexer,
    cur: Token,
    peek: Token,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let cur = lexer.next_token();
        let peek = lexer.next_token();
        Self { lexer, cur, peek }
    }

    fn bump(&mut self) -> Token {
        let next = self.lexer.next_token();
        let prev = std::mem::replace(&mut self.peek, next);
        std::mem::replace(&mut self.cur, prev)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        self.reject_illegal()?;
        if self.cur.kind == kind {
            Ok(self.bump())
        } else {
            Err(ParseError::at(
                &self.cur,
                format!(
                    "expected {} but found '{}' {}",
                    kind.as_str(),
                    self.cur.literal,
                    context
                ),
            ))
        }
    }

    /// Lexer diagnostics ride along as Illegal tokens; surface them here.
    fn reject_illegal(&self) -> Result<(), ParseError> {
        if self.cur.kind == TokenKind::Illegal {
            Err(ParseError::at(&self.cur, self.cur.literal.clone()))
        } else {
            Ok(())
        }
    }

    /// True when the current token can open a function call.
    fn at_call_head(&self) -> bool {
        matches!(self.cur.kind, TokenKind::Ident | TokenKind::Boolean)
            && self.peek.kind == TokenKind::LParen
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut nodes = Vec::new();
        while self.cur.kind != TokenKind::Eof {
            self.parse_statement(&mut nodes)?;
        }
        Ok(Program::new(nodes))
    }

    fn parse_statement(&mut self, nodes: &mut Vec<Node>) -> Result<(), ParseError> {
        self.reject_illegal()?;
        match self.cur.kind {
            TokenKind::Ident if self.cur.literal == "let" => self.parse_assignment(nodes),
            TokenKind::Ident if self.cur.literal == "include" => self.parse_include(nodes),
            TokenKind::Ident => self.parse_rule(nodes),
            _ => Err(ParseError::at(
                &self.cur,
                format!(
                    "expected a statement (let, include, or a rule) but found '{}'",
                    self.cur.literal
                ),
            )),
        }
    }

    // `let IDENT = VALUE [if|unless CALL]`
    fn parse_assignment(&mut self, nodes: &mut Vec<Node>) -> Result<(), ParseError> {
        self.bump(); // let
        self.reject_illegal()?;

        if matches!(self.cur.kind, TokenKind::Boolean | TokenKind::Number) {
            return Err(ParseError::at(
                &self.cur,
                format!("cannot assign to reserved word '{}'", self.cur.literal),
            ));
        }
        let name = self.expect(TokenKind::Ident, "as the assignment target")?;
        self.expect(TokenKind::Assign, "in assignment")?;

        if self.cur.kind == TokenKind::LSquare {
            return Err(ParseError::at(
                &self.cur,
                format!("arrays cannot be assigned to variable '{}'", name.literal),
            ));
        }

        let context = format!("in assignment to '{}'", name.literal);
        let value = self.parse_value(&context, true)?;
        let condition = self.parse_optional_condition()?;

        nodes.push(Node::Assignment(Assignment {
            name: name.literal,
            value,
            condition,
        }));
        Ok(())
    }

    // `include VALUE [if|unless CALL]` where VALUE may be a list of paths.
    fn parse_include(&mut self, nodes: &mut Vec<Node>) -> Result<(), ParseError> {
        self.bump(); // include

        let mut sources = Vec::new();
        if self.cur.kind == TokenKind::LSquare {
            self.bump();
            loop {
                self.reject_illegal()?;
                if self.cur.kind == TokenKind::RSquare {
                    self.bump();
                    break;
                }
                sources.push(self.parse_include_path()?);
                match self.cur.kind {
                    TokenKind::Comma => {
                        self.bump();
                    }
                    TokenKind::RSquare => {}
                    _ => {
                        return Err(ParseError::at(
                            &self.cur,
                            format!(
                                "expected ',' or ']' in include list but found '{}'",
                                self.cur.literal
                            ),
                        ));
                    }
                }
            }
        } else {
            sources.push(self.parse_include_path()?);
        }

        let condition = self.parse_optional_condition()?;
        for source in sources {
            nodes.push(Node::Include(Include {
                source,
                condition: condition.clone(),
            }));
        }
        Ok(())
    }

    fn parse_include_path(&mut self) -> Result<Value, ParseError> {
        self.reject_illegal()?;
        match self.cur.kind {
            TokenKind::Str => Ok(Value::Str(self.bump().literal)),
            TokenKind::Backtick => Ok(Value::Backtick(self.bump().literal)),
            _ => Err(ParseError::at(
                &self.cur,
                format!(
                    "include expects a string or backtick path but found '{}'",
                    self.cur.literal
                ),
            )),
        }
    }

    // `IDENT [triggered] { KEY => VALUE , ... }`
    fn parse_rule(&mut self, nodes: &mut Vec<Node>) -> Result<(), ParseError> {
        let module_tok = self.bump();
        let module = module_tok.literal.clone();

        let triggered = if self.cur.kind == TokenKind::Ident && self.cur.literal == "triggered" {
            self.bump();
            true
        } else {
            false
        };

        self.expect(
            TokenKind::LBrace,
            &format!("to open the body of rule '{}'", module),
        )?;

        let mut params: IndexMap<String, Value> = IndexMap::new();
        let mut condition: Option<Condition> = None;

        loop {
            self.reject_illegal()?;
            if self.cur.kind == TokenKind::RBrace {
                self.bump();
                break;
            }
            if self.cur.kind == TokenKind::Eof {
                return Err(ParseError::at(
                    &self.cur,
                    format!("unexpected end of input inside rule '{}'", module),
                ));
            }

            let key = self.expect(
                TokenKind::Ident,
                &format!("as a parameter name in rule '{}'", module),
            )?;
            self.expect(
                TokenKind::LAssign,
                &format!("after parameter '{}' in rule '{}'", key.literal, module),
            )?;

            if key.literal == "if" || key.literal == "unless" {
                if condition.is_some() {
                    return Err(ParseError::at(
                        &key,
                        format!("rule '{}' has more than one conditional", module),
                    ));
                }
                if !self.at_call_head() {
                    return Err(ParseError::at(
                        &self.cur,
                        format!("'{}' expects a function call in rule '{}'", key.literal, module),
                    ));
                }
                let kind = if key.literal == "if" {
                    ConditionKind::If
                } else {
                    ConditionKind::Unless
                };
                let call = self.parse_call(&format!("in rule '{}'", module))?;
                condition = Some(Condition { kind, call });
            } else if self.at_call_head() {
                return Err(ParseError::at(
                    &self.cur,
                    format!(
                        "function calls are only permitted for 'if' and 'unless', not parameter '{}'",
                        key.literal
                    ),
                ));
            } else if self.cur.kind == TokenKind::LSquare {
                let context = format!("in parameter '{}' of rule '{}'", key.literal, module);
                let items = self.parse_list(&context)?;
                params.insert(key.literal, Value::List(items));
            } else {
                let context = format!("in parameter '{}' of rule '{}'", key.literal, module);
                let value = self.parse_value(&context, false)?;
                params.insert(key.literal, value);
            }

            match self.cur.kind {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBrace => {}
                _ => {
                    return Err(ParseError::at(
                        &self.cur,
                        format!(
                            "expected ',' or '}}' in rule '{}' but found '{}'",
                            module, self.cur.literal
                        ),
                    ));
                }
            }
        }

        let name = match params.shift_remove("name") {
            Some(Value::Str(s)) => s,
            Some(other) => {
                return Err(ParseError::at(
                    &module_tok,
                    format!(
                        "the name of rule '{}' must be a string, not a {}",
                        module,
                        other.kind()
                    ),
                ));
            }
            None => Uuid::new_v4().to_string(),
        };
        let require = take_references(&mut params, "require", &module_tok, &module)?;
        let notify = take_references(&mut params, "notify", &module_tok, &module)?;

        nodes.push(Node::Rule(Rule {
            module,
            name,
            triggered,
            params,
            require,
            notify,
            condition,
        }));
        Ok(())
    }

    /// Parse one value. `allow_call` permits a top-level function call
    /// (assignment right-hand sides); call arguments themselves never may.
    fn parse_value(&mut self, context: &str, allow_call: bool) -> Result<Value, ParseError> {
        self.reject_illegal()?;
        if self.at_call_head() {
            if allow_call {
                return Ok(Value::Call(self.parse_call(context)?));
            }
            return Err(ParseError::at(
                &self.cur,
                format!("function calls may not be nested {}", context),
            ));
        }
        match self.cur.kind {
            TokenKind::Str => Ok(Value::Str(self.bump().literal)),
            TokenKind::Backtick => Ok(Value::Backtick(self.bump().literal)),
            TokenKind::Number => {
                let tok = self.bump();
                let n = tok.literal.parse::<i64>().map_err(|_| {
                    ParseError::at(&tok, format!("invalid number literal '{}'", tok.literal))
                })?;
                Ok(Value::Number(n))
            }
            TokenKind::Boolean => {
                let tok = self.bump();
                Ok(Value::Boolean(tok.literal == "true"))
            }
            // A bare identifier is a variable reference; defer resolution
            // to interpolation time.
            TokenKind::Ident => {
                let tok = self.bump();
                Ok(Value::Str(format!("${{{}}}", tok.literal)))
            }
            _ => Err(ParseError::at(
                &self.cur,
                format!("expected a value {} but found '{}'", context, self.cur.literal),
            )),
        }
    }

    // `IDENT ( VALUE , ... )` — the head may be a Boolean token since
    // `true` is an alias of `nonempty`.
    fn parse_call(&mut self, context: &str) -> Result<FunctionCall, ParseError> {
        let name = self.bump().literal;
        self.expect(
            TokenKind::LParen,
            &format!("to open the arguments of '{}' {}", name, context),
        )?;

        let mut args = Vec::new();
        loop {
            self.reject_illegal()?;
            if self.cur.kind == TokenKind::RParen {
                self.bump();
                break;
            }
            let arg_context = format!("in argument {} of '{}'", args.len() + 1, name);
            args.push(self.parse_value(&arg_context, false)?);
            match self.cur.kind {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RParen => {}
                _ => {
                    return Err(ParseError::at(
                        &self.cur,
                        format!(
                            "expected ',' or ')' in call to '{}' but found '{}'",
                            name, self.cur.literal
                        ),
                    ));
                }
            }
        }

        Ok(FunctionCall { name, args })
    }

    // `[ VALUE , ... ]` of primitives; trailing comma permitted.
    fn parse_list(&mut self, context: &str) -> Result<Vec<Value>, ParseError> {
        self.bump(); // [
        let mut items = Vec::new();
        loop {
            self.reject_illegal()?;
            if self.cur.kind == TokenKind::RSquare {
                self.bump();
                break;
            }
            if self.cur.kind == TokenKind::LSquare {
                return Err(ParseError::at(
                    &self.cur,
                    format!("nested lists are not supported {}", context),
                ));
            }
            items.push(self.parse_value(context, false)?);
            match self.cur.kind {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RSquare => {}
                _ => {
                    return Err(ParseError::at(
                        &self.cur,
                        format!(
                            "expected ',' or ']' {} but found '{}'",
                            context, self.cur.literal
                        ),
                    ));
                }
            }
        }
        Ok(items)
    }

    fn parse_optional_condition(&mut self) -> Result<Option<Condition>, ParseError> {
        if self.cur.kind != TokenKind::Ident {
            return Ok(None);
        }
        let kind = match self.cur.literal.as_str() {
            "if" => ConditionKind::If,
            "unless" => ConditionKind::Unless,
            _ => return Ok(None),
        };
        let keyword = self.bump();
        if !self.at_call_head() {
            return Err(ParseError::at(
                &self.cur,
                format!("'{}' expects a function call", keyword.literal),
            ));
        }
        let call = self.parse_call(&format!("after '{}'", keyword.literal))?;
        Ok(Some(Condition { kind, call }))
    }
}

/// Pull `require`/`notify` out of the parameter map as a list of rule names.
fn take_references(
    params: &mut IndexMap<String, Value>,
    key: &str,
    at: &Token,
    module: &str,
) -> Result<Vec<String>, ParseError> {
    match params.shift_remove(key) {
        None => Ok(Vec::new()),
        Some(Value::Str(s)) => Ok(vec![s]),
        Some(Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(s) => out.push(s),
                    other => {
                        return Err(ParseError::at(
                            at,
                            format!(
                                "'{}' entries in rule '{}' must be strings, not {}s",
                                key,
                                module,
                                other.kind()
                            ),
                        ));
                    }
                }
            }
            Ok(out)
        }
        Some(other) => Err(ParseError::at(
            at,
            format!(
                "'{}' in rule '{}' must be a string or a list of strings, not a {}",
                key,
                module,
                other.kind()
            ),
        )),
    }
}
