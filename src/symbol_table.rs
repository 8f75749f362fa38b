use std::collections::HashMap;

use crate::utils::suggest;

/// What a label refers to in a loaded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Index of an instruction in the text section.
    Text(usize),

    /// Index of a string in the data section.
    Data(usize),
}

/// Mapping from label names to the locations they define.
#[derive(Default, Debug, Clone)]
pub struct SymbolTable {
    inner: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            inner: HashMap::new(),
        }
    }

    /// Defines `label`. A label can be defined only once; on a redefinition the
    /// existing symbol is returned as the error and the table is left unchanged.
    pub(crate) fn define<S: Into<String>>(&mut self, label: S, symbol: Symbol) -> Result<(), Symbol> {
        let label = label.into();

        if let Some(existing) = self.inner.get(&label) {
            return Err(*existing);
        }

        self.inner.insert(label, symbol);

        Ok(())
    }

    pub fn get<S: AsRef<str>>(&self, label: S) -> Option<Symbol> {
        self.inner.get(label.as_ref()).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item=&str> {
        self.inner.keys().map(|label| label.as_str())
    }

    /// Finds a defined label that is a likely misspelling of `label`.
    pub fn suggest<S: AsRef<str>>(&self, label: S) -> Option<String> {
        suggest(label.as_ref(), self.labels())
    }
}

#[test]
fn test_duplicate_definition() {
    let mut table = SymbolTable::new();

    assert_eq!(table.define("main", Symbol::Text(0)), Ok(()));
    assert_eq!(table.define("str0", Symbol::Data(0)), Ok(()));
    assert_eq!(table.define("main", Symbol::Text(7)), Err(Symbol::Text(0)));

    assert_eq!(table.get("main"), Some(Symbol::Text(0)));
    assert_eq!(table.len(), 2);
}

#[test]
fn test_label_suggestion() {
    let mut table = SymbolTable::new();
    table.define("endwhile1", Symbol::Text(3)).unwrap();
    table.define("main_exit", Symbol::Text(9)).unwrap();

    assert_eq!(table.suggest("endwhile2"), Some("endwhile1".to_string()));
    assert_eq!(table.suggest("print_int"), None);
}
