use std::collections::HashSet;

use toycc::{
    asm,
    codegen::Line,
    lang::Program,
};

const SOURCES: [&str; 7] = [
    include_str!("programs/return42.c"),
    include_str!("programs/count.c"),
    include_str!("programs/hello.c"),
    include_str!("programs/divzero.c"),
    include_str!("programs/compare.c"),
    include_str!("programs/fizzbuzz.c"),
    include_str!("programs/steps.c"),
];

#[test]
fn test_pretty_printed_source_parses_back() {
    for source in SOURCES.iter() {
        let program = Program::parse(source).expect("could not parse");
        let printed = program.to_string();

        let reparsed = Program::parse(&printed)
            .unwrap_or_else(|e| panic!("printed source does not parse: {}\n{}", e, printed));

        assert_eq!(reparsed, program);
        assert_eq!(reparsed.to_string(), printed);
    }
}

#[test]
fn test_fizzbuzz_labels() {
    let assembly = toycc::compile(include_str!("programs/fizzbuzz.c")).unwrap();
    let labels: Vec<&str> = assembly.labels().collect();
    let unique: HashSet<&str> = labels.iter().copied().collect();

    // One loop and three conditionals, two labels each, plus the function and its epilogue.
    assert_eq!(labels.len(), 10);
    assert_eq!(unique.len(), labels.len());
    assert!(unique.contains("main_exit"));
    assert!(unique.contains("for0"));
    assert!(unique.contains("endfor1"));
}

#[test]
fn test_generated_assembly_loads_back() {
    for source in SOURCES.iter() {
        let assembly = toycc::compile(source).unwrap();
        let program = asm::Program::parse(&assembly.to_string())
            .unwrap_or_else(|e| panic!("generated assembly does not load: {}\n{}", e, assembly));

        let generated: Vec<_> = assembly.text.iter()
            .filter_map(|line| match line {
                Line::Instruction(instruction) => Some(instruction),
                _ => None,
            })
            .collect();

        let loaded: Vec<_> = program.instructions.iter()
            .map(|entry| &entry.instruction)
            .take(generated.len())
            .collect();

        assert_eq!(loaded, generated);
        assert_eq!(program.strings.len(), assembly.data.len());

        for ((label, text), string) in assembly.data.iter().zip(&program.strings) {
            assert_eq!(&string.label, label);
            assert_eq!(&string.text, text);
        }
    }
}
