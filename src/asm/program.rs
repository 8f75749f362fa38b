use std::fmt;

use crate::instruction::Instruction;
use crate::symbol_table::{Symbol, SymbolTable};

use super::parser::{label_definition, parse_instruction, AsmErrorKind, ParseError};

/// An instruction together with the source line it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionEntry {
    pub instruction: Instruction,
    pub line: usize,
}

/// A string constant from the data section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataString {
    pub label: String,
    pub text: String,
}

/// A loaded assembly program.
#[derive(Debug, Default, Clone)]
pub struct Program {
    pub instructions: Vec<InstructionEntry>,
    pub strings: Vec<DataString>,
    pub symbol_table: SymbolTable,
}

/// Error produced while loading assembly text, with the line number it occured on.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadError {
    pub line: usize,
    pub error: ParseError,
}

impl LoadError {
    pub fn kind(&self) -> Option<&AsmErrorKind> {
        self.error.kind()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Data,
    Text,
}

/// A string literal whose closing quote has not been seen yet.
struct PendingString {
    label: String,
    text: String,
    line: usize,
}

/// Decodes string literal content up to the closing quote into `text`.
///
/// Returns the input following the quote, or `None` if the line ended first.
fn scan_string<'a>(input: &'a str, text: &mut String) -> Option<&'a str> {
    let mut chars = input.char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => return Some(&input[offset + 1..]),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, '0')) => text.push('\0'),
                Some((_, escaped)) => text.push(escaped),
                None => text.push('\\'),
            },
            c => text.push(c),
        }
    }

    None
}

fn is_blank(rest: &str) -> bool {
    let rest = rest.trim();
    rest.is_empty() || rest.starts_with('#')
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(index) => &line[..index],
        None => line,
    }
}

impl Program {
    /// Loads assembly text.
    ///
    /// Lines before any section directive belong to the text section.
    pub fn parse(source: &str) -> Result<Program, LoadError> {
        let mut program = Program::default();
        let mut section = Section::Text;
        let mut pending: Option<PendingString> = None;

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let error = |input: &str, kind| LoadError {
                line,
                error: ParseError::from_kind(input, kind),
            };

            if let Some(mut string) = pending.take() {
                match scan_string(raw, &mut string.text) {
                    Some(rest) if is_blank(rest) => program.define_string(string)?,
                    Some(rest) => return Err(error(rest, AsmErrorKind::InvalidDirective)),
                    None => {
                        string.text.push('\n');
                        pending = Some(string);
                    },
                }

                continue;
            }

            let trimmed = raw.trim();

            if is_blank(trimmed) {
                continue;
            }

            if trimmed.starts_with('.') {
                let directive = strip_comment(trimmed).trim();
                let name = directive.split_whitespace().next().unwrap_or("");

                section = match name {
                    ".data" => Section::Data,
                    ".text" => Section::Text,
                    ".globl" => section,
                    _ => return Err(error(directive, AsmErrorKind::InvalidDirective)),
                };

                continue;
            }

            match section {
                Section::Data => {
                    let (label, rest) = match label_definition(trimmed) {
                        Ok((rest, label)) => (label, rest.trim_start()),
                        Err(_) => return Err(error(trimmed, AsmErrorKind::InvalidDirective)),
                    };

                    let literal = match rest.strip_prefix(".asciiz") {
                        Some(literal) => literal.trim_start(),
                        None => return Err(error(rest, AsmErrorKind::InvalidDirective)),
                    };

                    let content = match literal.strip_prefix('"') {
                        Some(content) => content,
                        None => return Err(error(literal, AsmErrorKind::InvalidDirective)),
                    };

                    let mut string = PendingString {
                        label: label.to_string(),
                        text: String::new(),
                        line,
                    };

                    match scan_string(content, &mut string.text) {
                        Some(rest) if is_blank(rest) => program.define_string(string)?,
                        Some(rest) => return Err(error(rest, AsmErrorKind::InvalidDirective)),
                        None => {
                            string.text.push('\n');
                            pending = Some(string);
                        },
                    }
                },
                Section::Text => {
                    let code = strip_comment(trimmed).trim();

                    let rest = match label_definition(code) {
                        Ok((rest, label)) => {
                            let symbol = Symbol::Text(program.instructions.len());
                            program.define(label, symbol, line)?;
                            rest.trim()
                        },
                        Err(_) => code,
                    };

                    if !rest.is_empty() {
                        let instruction = parse_instruction(rest)
                            .map_err(|error| LoadError { line, error })?;

                        program.instructions.push(InstructionEntry { instruction, line });
                    }
                },
            }
        }

        if let Some(string) = pending {
            return Err(LoadError {
                line: string.line,
                error: ParseError::from_kind("", AsmErrorKind::UnterminatedString),
            });
        }

        Ok(program)
    }

    fn define(&mut self, label: &str, symbol: Symbol, line: usize) -> Result<(), LoadError> {
        self.symbol_table.define(label, symbol)
            .map_err(|_| LoadError {
                line,
                error: ParseError::from_kind("", AsmErrorKind::DuplicateLabel(label.to_string())),
            })
    }

    fn define_string(&mut self, string: PendingString) -> Result<(), LoadError> {
        let symbol = Symbol::Data(self.strings.len());
        self.define(&string.label, symbol, string.line)?;

        self.strings.push(DataString {
            label: string.label,
            text: string.text,
        });

        Ok(())
    }

    /// Index of the instruction a text label points to.
    pub fn text_label<S: AsRef<str>>(&self, label: S) -> Option<usize> {
        match self.symbol_table.get(label) {
            Some(Symbol::Text(index)) => Some(index),
            _ => None,
        }
    }

    /// Index and contents of the string a data label points to.
    pub fn data_label<S: AsRef<str>>(&self, label: S) -> Option<(usize, &str)> {
        match self.symbol_table.get(label) {
            Some(Symbol::Data(index)) => self.strings.get(index)
                .map(|string| (index, string.text.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Register;

    #[test]
    fn test_sections_and_labels() {
        let source = "
            .data
            str0: .asciiz \"hi\\n\"   # greeting

            .text
            .globl main

            main:   li $t0, 1   # one
            loop:
                    addi $t0, $t0, 1
            # comment only
            done: jr $ra
        ";

        let program = Program::parse(source).expect("could not load");

        assert_eq!(program.instructions.len(), 3);
        assert_eq!(program.text_label("main"), Some(0));
        assert_eq!(program.text_label("loop"), Some(1));
        assert_eq!(program.text_label("done"), Some(2));
        assert_eq!(program.data_label("str0"), Some((0, "hi\n")));
        assert_eq!(program.text_label("str0"), None);
        assert_eq!(program.instructions[2].line, 12);
        assert_eq!(program.instructions[2].instruction, Instruction::JumpRegister { rs: Register::Ra });
    }

    #[test]
    fn test_string_spanning_lines() {
        let source = ".data\nmsg: .asciiz \"first\n  second\n\nthird\"\n.text\nmain: nop\n";
        let program = Program::parse(source).unwrap();

        assert_eq!(program.data_label("msg"), Some((0, "first\n  second\n\nthird")));
        assert_eq!(program.text_label("main"), Some(0));
    }

    #[test]
    fn test_string_escapes() {
        let program = Program::parse(r#".data
s: .asciiz "tab\there \"quoted\" back\\slash # not a comment"
"#).unwrap();

        assert_eq!(program.strings[0].text, "tab\there \"quoted\" back\\slash # not a comment");
    }

    #[test]
    fn test_unterminated_string() {
        let err = Program::parse(".data\na: .asciiz \"ok\"\nb: .asciiz \"never\nclosed\n").unwrap_err();

        assert_eq!(err.line, 3);
        assert_eq!(err.kind(), Some(&AsmErrorKind::UnterminatedString));
    }

    #[test]
    fn test_duplicate_label() {
        let err = Program::parse("main: nop\nloop: nop\nmain: nop\n").unwrap_err();

        assert_eq!(err.line, 3);
        assert_eq!(err.kind(), Some(&AsmErrorKind::DuplicateLabel("main".into())));
        assert_eq!(err.to_string(), "line 3: label `main` is defined more than once");
    }

    #[test]
    fn test_invalid_directive() {
        let err = Program::parse(".text\n.word 4\n").unwrap_err();

        assert_eq!(err.line, 2);
        assert_eq!(err.kind(), Some(&AsmErrorKind::InvalidDirective));
        assert_eq!(err.to_string(), "line 2: invalid directive at `.word 4`");
    }

    #[test]
    fn test_unknown_opcode_line() {
        let err = Program::parse("main:\n    li $t0, 1\n    frob $t0\n").unwrap_err();

        assert_eq!(err.line, 3);
        assert_eq!(err.kind(), Some(&AsmErrorKind::UnknownOpcode {
            opcode: "frob".into(),
            suggestion: None,
        }));
    }
}
