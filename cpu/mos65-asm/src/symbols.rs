use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u16,
    /// Label was written with a trailing `:`.
    pub global: bool,
}

/// Labels defined by the assembler, kept in definition order. Names are case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: FxHashMap<String, usize>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false without modifying the table if `name` is already defined.
    pub fn define(&mut self, name: &str, address: u16, global: bool) -> bool {
        if self.by_name.contains_key(name) {
            return false;
        }

        self.by_name.insert(name.into(), self.symbols.len());
        self.symbols.push(Symbol { name: name.into(), address, global });
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&i| &self.symbols[i])
    }

    #[must_use]
    pub fn address(&self, name: &str) -> Option<u16> {
        self.get(name).map(|symbol| symbol.address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_look_up() {
        let mut symbols = SymbolTable::new();
        assert!(symbols.define("main", 0x0100, true));
        assert!(symbols.define("loop", 0x0105, false));

        assert_eq!(symbols.address("main"), Some(0x0100));
        assert_eq!(symbols.get("loop").map(|symbol| symbol.global), Some(false));
        assert_eq!(symbols.address("Main"), None);

        let names: Vec<_> = symbols.iter().map(|symbol| symbol.name.as_str()).collect();
        assert_eq!(names, ["main", "loop"]);
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut symbols = SymbolTable::new();
        assert!(symbols.define("x1", 0x0010, false));
        assert!(!symbols.define("x1", 0x0020, true));

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols.address("x1"), Some(0x0010));
        assert_eq!(symbols.get("x1").map(|symbol| symbol.global), Some(false));
    }
}
