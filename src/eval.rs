//! Address evaluation for the `<MAP-ADDRESS / SYMBOL NAME>` argument
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::interface::parse_literal;

/// Turns the address argument of `mmapfile` into a number. The registrar trusts the result.
pub trait AddressEvaluator {
    fn evaluate(&self, expr: &str) -> Result<u64, String>;
}

/// Evaluates literals (`0x` for hex, decimal otherwise), names defined with `define`, and
/// `name+literal` / `name-literal`.
#[derive(Debug, Default)]
pub struct SymbolEvaluator {
    symbols: RwLock<HashMap<String, u64>>,
}

impl SymbolEvaluator {
    pub fn new() -> Self {
        SymbolEvaluator::default()
    }

    pub fn define(&self, name: &str, addr: u64) {
        self.symbols.write().insert(name.to_string(), addr);
    }

    pub fn lookup(&self, name: &str) -> Option<u64> {
        self.symbols.read().get(name).copied()
    }

    fn term(&self, term: &str) -> Result<u64, String> {
        let term = term.trim();
        if term.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_literal(term).map_err(|e| e.to_string());
        }
        self.lookup(term)
            .ok_or_else(|| format!("No symbol \"{}\" in current context.", term))
    }
}

impl AddressEvaluator for SymbolEvaluator {
    fn evaluate(&self, expr: &str) -> Result<u64, String> {
        if let Some((base, off)) = expr.split_once('+') {
            let base = self.term(base)?;
            return base
                .checked_add(self.term(off)?)
                .ok_or_else(|| format!("address {} out of range", expr));
        }
        if let Some((base, off)) = expr.split_once('-') {
            let base = self.term(base)?;
            return base
                .checked_sub(self.term(off)?)
                .ok_or_else(|| format!("address {} out of range", expr));
        }
        self.term(expr)
    }
}
