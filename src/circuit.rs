use serde::{Deserialize, Serialize};

use crate::error::{GabesError, Result};

/// The boolean gate types the circuit grammar accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateKind {
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
    /// Exclusive or.
    Xor,
    /// Negated conjunction.
    Nand,
    /// Negated exclusive or.
    Xnor,
    /// Negation (unary).
    Not,
}

/// Truth tables for the binary gate kinds, indexed by `(a << 1) | b`.
///
/// Adding a binary gate type is a one-line extension here plus a name in
/// the parser table.
const TRUTH_TABLES: [(GateKind, [bool; 4]); 5] = [
    (GateKind::And, [false, false, false, true]),
    (GateKind::Or, [false, true, true, true]),
    (GateKind::Xor, [false, true, true, false]),
    (GateKind::Nand, [true, true, true, false]),
    (GateKind::Xnor, [true, false, false, true]),
];

impl GateKind {
    /// Whether this kind takes a single input.
    pub fn is_unary(self) -> bool {
        matches!(self, GateKind::Not)
    }

    /// The 4-bit truth table of a binary kind.
    pub fn truth_table(self) -> [bool; 4] {
        TRUTH_TABLES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, table)| *table)
            .expect("unary gates have no 4-bit truth table")
    }

    /// Apply the gate to plaintext bits.
    pub fn apply(self, a: bool, b: Option<bool>) -> bool {
        if self.is_unary() {
            return !a;
        }
        let b = b.expect("binary gate requires a right input");
        self.truth_table()[((a as usize) << 1) | b as usize]
    }

    /// The grammar spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Xor => "XOR",
            GateKind::Nand => "NAND",
            GateKind::Xnor => "XNOR",
            GateKind::Not => "NOT",
        }
    }

    fn from_str(name: &str) -> Option<Self> {
        match name {
            "AND" => Some(GateKind::And),
            "OR" => Some(GateKind::Or),
            "XOR" => Some(GateKind::Xor),
            "NAND" => Some(GateKind::Nand),
            "XNOR" => Some(GateKind::Xnor),
            "NOT" => Some(GateKind::Not),
            _ => None,
        }
    }
}

/// A gate input: either an input-wire identifier leaf or a nested gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateInput {
    /// Leaf referencing an input wire by identifier.
    Wire(String),
    /// Nested sub-gate; the gate exclusively owns it.
    Gate(Box<Gate>),
}

/// One gate of the circuit tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    /// Boolean operation.
    pub kind: GateKind,
    /// Identifier of this gate's output wire.
    pub output: String,
    /// Left input.
    pub left: GateInput,
    /// Right input; absent for NOT.
    pub right: Option<GateInput>,
}

/// A boolean circuit: a tree of gates rooted at the output gate.
///
/// Shared wires are represented by repeating the identifier at multiple
/// leaves, so the tree needs no shared-ownership machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    /// The output gate.
    pub root: Gate,
}

impl Circuit {
    /// Parse a circuit from its textual description.
    ///
    /// Grammar: `GATE(type, identifier, <left>[, <right>])` where each
    /// input is a wire identifier or a nested `GATE(...)`. Whitespace is
    /// insignificant.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::new(text);
        let root = parser.parse_gate()?;
        parser.expect_end()?;
        Ok(Circuit { root })
    }

    /// Render the circuit back to canonical text.
    ///
    /// `parse(emit(c))` reproduces `c` structurally.
    pub fn emit(&self) -> String {
        let mut out = String::new();
        emit_gate(&self.root, &mut out);
        out
    }

    /// Input-wire identifiers in first-visit order of a left-to-right
    /// depth-first walk. Repeated identifiers appear once.
    pub fn input_identifiers(&self) -> Vec<String> {
        let mut seen = Vec::new();
        collect_inputs(&self.root, &mut seen);
        seen
    }

    /// Number of gates in the tree.
    pub fn gate_count(&self) -> u64 {
        count_gates(&self.root)
    }

    /// Evaluate the circuit in plaintext, as a cross-check oracle.
    pub fn evaluate_plain(&self, inputs: &std::collections::HashMap<String, bool>) -> Result<bool> {
        evaluate_plain_gate(&self.root, inputs)
    }
}

fn evaluate_plain_gate(
    gate: &Gate,
    inputs: &std::collections::HashMap<String, bool>,
) -> Result<bool> {
    let left = evaluate_plain_input(&gate.left, inputs)?;
    let right = match &gate.right {
        Some(input) => Some(evaluate_plain_input(input, inputs)?),
        None => None,
    };
    Ok(gate.kind.apply(left, right))
}

fn evaluate_plain_input(
    input: &GateInput,
    inputs: &std::collections::HashMap<String, bool>,
) -> Result<bool> {
    match input {
        GateInput::Wire(id) => inputs
            .get(id)
            .copied()
            .ok_or_else(|| GabesError::Parse(format!("no value for input wire '{id}'"))),
        GateInput::Gate(sub) => evaluate_plain_gate(sub, inputs),
    }
}

fn emit_gate(gate: &Gate, out: &mut String) {
    out.push_str("GATE(");
    out.push_str(gate.kind.as_str());
    out.push_str(", ");
    out.push_str(&gate.output);
    out.push_str(", ");
    emit_input(&gate.left, out);
    if let Some(right) = &gate.right {
        out.push_str(", ");
        emit_input(right, out);
    }
    out.push(')');
}

fn emit_input(input: &GateInput, out: &mut String) {
    match input {
        GateInput::Wire(id) => out.push_str(id),
        GateInput::Gate(gate) => emit_gate(gate, out),
    }
}

fn collect_inputs(gate: &Gate, seen: &mut Vec<String>) {
    for input in [Some(&gate.left), gate.right.as_ref()].into_iter().flatten() {
        match input {
            GateInput::Wire(id) => {
                if !seen.iter().any(|existing| existing == id) {
                    seen.push(id.clone());
                }
            }
            GateInput::Gate(sub) => collect_inputs(sub, seen),
        }
    }
}

fn count_gates(gate: &Gate) -> u64 {
    let mut count = 1;
    for input in [Some(&gate.left), gate.right.as_ref()].into_iter().flatten() {
        if let GateInput::Gate(sub) = input {
            count += count_gates(sub);
        }
    }
    count
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    LParen,
    RParen,
    Comma,
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some(&(offset, c)) = chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    chars.next();
                }
                '(' => {
                    tokens.push((Token::LParen, offset));
                    chars.next();
                }
                ')' => {
                    tokens.push((Token::RParen, offset));
                    chars.next();
                }
                ',' => {
                    tokens.push((Token::Comma, offset));
                    chars.next();
                }
                _ => {
                    let mut ident = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            ident.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if ident.is_empty() {
                        // Unknown character; tokenize it alone so the
                        // parser reports it with its offset.
                        ident.push(c);
                        chars.next();
                    }
                    tokens.push((Token::Ident(ident), offset));
                }
            }
        }

        Parser { tokens, position: 0 }
    }

    fn parse_gate(&mut self) -> Result<Gate> {
        self.expect_keyword("GATE")?;
        self.expect(Token::LParen)?;

        let kind_name = self.expect_ident()?;
        let kind = GateKind::from_str(&kind_name)
            .ok_or_else(|| self.error(format!("unknown gate type '{kind_name}'")))?;
        self.expect(Token::Comma)?;

        let output = self.expect_ident()?;
        self.expect(Token::Comma)?;

        let left = self.parse_input()?;
        let right = if kind.is_unary() {
            None
        } else {
            self.expect(Token::Comma)?;
            Some(self.parse_input()?)
        };

        self.expect(Token::RParen)?;
        Ok(Gate {
            kind,
            output,
            left,
            right,
        })
    }

    fn parse_input(&mut self) -> Result<GateInput> {
        if self.peek_keyword("GATE") {
            Ok(GateInput::Gate(Box::new(self.parse_gate()?)))
        } else {
            let id = self.expect_ident()?;
            Ok(GateInput::Wire(id))
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.tokens.get(self.position), Some((Token::Ident(name), _)) if name == keyword)
            && matches!(self.tokens.get(self.position + 1), Some((Token::LParen, _)))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.next_token() {
            Some((Token::Ident(name), _)) if name == keyword => Ok(()),
            other => Err(unexpected(other, &format!("'{keyword}'"))),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.next_token() {
            Some((Token::Ident(name), _)) => Ok(name),
            other => Err(unexpected(other, "an identifier")),
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        let wanted = describe(&token);
        match self.next_token() {
            Some((found, _)) if found == token => Ok(()),
            other => Err(unexpected(other, wanted)),
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.next_token() {
            None => Ok(()),
            other => Err(unexpected(other, "end of input")),
        }
    }

    fn next_token(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn error(&self, message: String) -> GabesError {
        GabesError::Parse(message)
    }
}

fn describe(token: &Token) -> &'static str {
    match token {
        Token::Ident(_) => "an identifier",
        Token::LParen => "'('",
        Token::RParen => "')'",
        Token::Comma => "','",
    }
}

fn unexpected(found: Option<(Token, usize)>, wanted: &str) -> GabesError {
    match found {
        Some((token, offset)) => GabesError::Parse(format!(
            "expected {wanted} at offset {offset}, found {}",
            match token {
                Token::Ident(name) => format!("'{name}'"),
                other => describe(&other).to_string(),
            }
        )),
        None => GabesError::Parse(format!("expected {wanted}, found end of input")),
    }
}
