//! Sandboxed arithmetic expression evaluator.
//!
//! A hand-written recursive-descent parser over numeric literals, the
//! arithmetic operators, and an allow-listed set of math functions and
//! constants. Nothing outside that vocabulary resolves: no identifiers,
//! no I/O, no general execution. A `math.` prefix on names is accepted
//! (`math.sqrt(144)`), matching the documented tool examples.
//!
//! The numeric tower mirrors the observed tool behavior: integer
//! arithmetic stays integral (`2+2` is `4`), while division, fractional
//! exponents, functions, and constants produce floats (`16 ** 0.5` is `4.0`).

use std::fmt;

use thiserror::Error;

/// Why an expression failed to evaluate. Rendered into the user-facing
/// "Erro ao calcular: ..." string by [`evaluate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("invalid number '{0}'")]
    BadNumber(String),

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("wrong number of arguments for '{0}'")]
    Arity(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("math domain error in '{0}'")]
    Domain(String),

    #[error("expression too deeply nested")]
    TooDeep,
}

/// An evaluated value. Integers and floats format differently, so the
/// distinction is kept all the way to the result string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) if x.is_nan() => write!(f, "nan"),
            Number::Float(x) if x.is_infinite() => {
                write!(f, "{}", if x > 0.0 { "inf" } else { "-inf" })
            }
            // Keep a decimal point on whole-valued floats: 4.0, not 4.
            Number::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{x:.1}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Evaluates an expression, converting every failure into the user-facing
/// error string. This function never panics and never propagates an error.
pub fn evaluate(input: &str) -> String {
    match eval_expr(input) {
        Ok(n) => n.to_string(),
        Err(e) => format!("Erro ao calcular: {e}"),
    }
}

/// Parses and evaluates an expression against the allow-listed vocabulary.
pub fn eval_expr(input: &str) -> Result<Number, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr(0)?;
    match parser.peek() {
        Some(tok) => Err(EvalError::UnexpectedToken(tok.describe())),
        None => Ok(value),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Int(i) => i.to_string(),
            Token::Float(x) => x.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Percent => "%".into(),
            Token::Pow => "**".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Pow);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent part: 'e'/'E' with an optional sign, digits
                // required. A bare trailing 'e' stays an identifier so the
                // constant `2 * e` keeps working.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let lit: String = chars[start..i].iter().collect();
                tokens.push(parse_number(&lit)?);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn parse_number(lit: &str) -> Result<Token, EvalError> {
    if lit.contains('.') {
        lit.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| EvalError::BadNumber(lit.to_string()))
    } else if let Ok(i) = lit.parse::<i64>() {
        Ok(Token::Int(i))
    } else {
        // Exponent form, or an integer literal wider than i64; carry as float.
        lit.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| EvalError::BadNumber(lit.to_string()))
    }
}

/// Recursion guard for pathological inputs like long runs of parentheses.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self, depth: usize) -> Result<Number, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        let mut lhs = self.term(depth + 1)?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    lhs = add(lhs, self.term(depth + 1)?);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    lhs = sub(lhs, self.term(depth + 1)?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self, depth: usize) -> Result<Number, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        let mut lhs = self.unary(depth + 1)?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    lhs = mul(lhs, self.unary(depth + 1)?);
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    lhs = div(lhs, self.unary(depth + 1)?)?;
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    lhs = rem(lhs, self.unary(depth + 1)?)?;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self, depth: usize) -> Result<Number, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(neg(self.unary(depth + 1)?))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary(depth + 1)
            }
            _ => self.power(depth + 1),
        }
    }

    // '**' binds tighter than unary minus on its left and is right-associative:
    // -2**2 is -4, 2**-1 is 0.5.
    fn power(&mut self, depth: usize) -> Result<Number, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        let base = self.atom(depth + 1)?;
        if matches!(self.peek(), Some(Token::Pow)) {
            self.pos += 1;
            let exp = self.unary(depth + 1)?;
            return pow(base, exp);
        }
        Ok(base)
    }

    fn atom(&mut self, depth: usize) -> Result<Number, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        match self.advance() {
            Some(Token::Int(i)) => Ok(Number::Int(i)),
            Some(Token::Float(x)) => Ok(Number::Float(x)),
            Some(Token::LParen) => {
                let value = self.expr(depth + 1)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(tok) => Err(EvalError::UnexpectedToken(tok.describe())),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(Token::Ident(name)) => self.name(&name, depth),
            Some(tok) => Err(EvalError::UnexpectedToken(tok.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn name(&mut self, name: &str, depth: usize) -> Result<Number, EvalError> {
        let bare = name.strip_prefix("math.").unwrap_or(name);
        if bare.contains('.') || bare.is_empty() {
            return Err(EvalError::UnknownName(name.to_string()));
        }

        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            let mut args = Vec::new();
            if !matches!(self.peek(), Some(Token::RParen)) {
                loop {
                    args.push(self.expr(depth + 1)?);
                    if matches!(self.peek(), Some(Token::Comma)) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
            }
            match self.advance() {
                Some(Token::RParen) => apply(bare, &args),
                Some(tok) => Err(EvalError::UnexpectedToken(tok.describe())),
                None => Err(EvalError::UnexpectedEnd),
            }
        } else {
            constant(bare).ok_or_else(|| EvalError::UnknownName(name.to_string()))
        }
    }
}

fn constant(name: &str) -> Option<Number> {
    match name {
        "pi" => Some(Number::Float(std::f64::consts::PI)),
        "e" => Some(Number::Float(std::f64::consts::E)),
        "tau" => Some(Number::Float(std::f64::consts::TAU)),
        _ => None,
    }
}

fn apply(name: &str, args: &[Number]) -> Result<Number, EvalError> {
    match name {
        "pow" => {
            let [base, exp] = two_args(name, args)?;
            pow(base, exp)
        }
        // log(x) is the natural log; log(x, b) uses an explicit base.
        "log" if args.len() == 2 => {
            let x = as_f64(args[0]);
            let b = as_f64(args[1]);
            if x <= 0.0 || b <= 0.0 || b == 1.0 {
                return Err(EvalError::Domain(name.to_string()));
            }
            Ok(Number::Float(x.log(b)))
        }
        "abs" => match one_arg(name, args)? {
            Number::Int(i) => i
                .checked_abs()
                .map(Number::Int)
                .ok_or_else(|| EvalError::Domain(name.to_string())),
            Number::Float(x) => Ok(Number::Float(x.abs())),
        },
        "floor" | "ceil" | "round" => {
            let n = one_arg(name, args)?;
            let x = as_f64(n);
            let rounded = match name {
                "floor" => x.floor(),
                "ceil" => x.ceil(),
                _ => x.round(),
            };
            if let Number::Int(i) = n {
                return Ok(Number::Int(i));
            }
            if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                Ok(Number::Int(rounded as i64))
            } else {
                Ok(Number::Float(rounded))
            }
        }
        "sqrt" | "sin" | "cos" | "tan" | "asin" | "acos" | "atan" | "ln" | "log" | "log10"
        | "log2" | "exp" => {
            let x = as_f64(one_arg(name, args)?);
            let result = match name {
                "sqrt" if x < 0.0 => return Err(EvalError::Domain(name.to_string())),
                "sqrt" => x.sqrt(),
                "sin" => x.sin(),
                "cos" => x.cos(),
                "tan" => x.tan(),
                "asin" | "acos" if !(-1.0..=1.0).contains(&x) => {
                    return Err(EvalError::Domain(name.to_string()))
                }
                "asin" => x.asin(),
                "acos" => x.acos(),
                "atan" => x.atan(),
                "ln" | "log" if x <= 0.0 => return Err(EvalError::Domain(name.to_string())),
                "ln" | "log" => x.ln(),
                "log10" if x <= 0.0 => return Err(EvalError::Domain(name.to_string())),
                "log10" => x.log10(),
                "log2" if x <= 0.0 => return Err(EvalError::Domain(name.to_string())),
                "log2" => x.log2(),
                "exp" => x.exp(),
                _ => unreachable!("outer arm restricts the names"),
            };
            Ok(Number::Float(result))
        }
        _ => Err(EvalError::UnknownName(name.to_string())),
    }
}

fn one_arg(name: &str, args: &[Number]) -> Result<Number, EvalError> {
    match args {
        [n] => Ok(*n),
        _ => Err(EvalError::Arity(name.to_string())),
    }
}

fn two_args(name: &str, args: &[Number]) -> Result<[Number; 2], EvalError> {
    match args {
        [a, b] => Ok([*a, *b]),
        _ => Err(EvalError::Arity(name.to_string())),
    }
}

fn as_f64(n: Number) -> f64 {
    match n {
        Number::Int(i) => i as f64,
        Number::Float(x) => x,
    }
}

fn add(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_add(y)
            .map(Number::Int)
            .unwrap_or(Number::Float(x as f64 + y as f64)),
        _ => Number::Float(as_f64(a) + as_f64(b)),
    }
}

fn sub(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map(Number::Int)
            .unwrap_or(Number::Float(x as f64 - y as f64)),
        _ => Number::Float(as_f64(a) - as_f64(b)),
    }
}

fn mul(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map(Number::Int)
            .unwrap_or(Number::Float(x as f64 * y as f64)),
        _ => Number::Float(as_f64(a) * as_f64(b)),
    }
}

// True division: always a float, zero divisor is an error.
fn div(a: Number, b: Number) -> Result<Number, EvalError> {
    if as_f64(b) == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Number::Float(as_f64(a) / as_f64(b)))
}

// Floored modulo: the result takes the sign of the divisor.
fn rem(a: Number, b: Number) -> Result<Number, EvalError> {
    if as_f64(b) == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let r = x % y;
            let r = if r != 0 && (r < 0) != (y < 0) { r + y } else { r };
            Ok(Number::Int(r))
        }
        _ => {
            let (x, y) = (as_f64(a), as_f64(b));
            let r = x % y;
            let r = if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r };
            Ok(Number::Float(r))
        }
    }
}

fn neg(n: Number) -> Number {
    match n {
        Number::Int(i) => i
            .checked_neg()
            .map(Number::Int)
            .unwrap_or(Number::Float(-(i as f64))),
        Number::Float(x) => Number::Float(-x),
    }
}

fn pow(base: Number, exp: Number) -> Result<Number, EvalError> {
    if let (Number::Int(x), Number::Int(y)) = (base, exp) {
        if (0..=u32::MAX as i64).contains(&y) {
            if let Some(v) = x.checked_pow(y as u32) {
                return Ok(Number::Int(v));
            }
        }
    }
    let result = as_f64(base).powf(as_f64(exp));
    // A NaN out of finite operands means a negative base with a fractional
    // exponent, which has no real result.
    if result.is_nan() && !as_f64(base).is_nan() && !as_f64(exp).is_nan() {
        return Err(EvalError::Domain("**".to_string()));
    }
    Ok(Number::Float(result))
}
