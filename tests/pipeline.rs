use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use quill::bytecode::compile_error::CompileError;
use quill::bytecode::op::{Instruction, Opcode};
use quill::bytecode::ProgramBc;
use quill::frontend::parser_error::ParseErrorKind;
use quill::lang::value::Value;
use quill::{Error, compile_source, parse_source};

const PROGRAM: &str = r#"
# running totals
total := 0
evens := []
for n in range(10) {
    if n % 2 == 0 then { evens.push(n) }
    total = total + n
}

i := 0
while i < 3 {
    i = i + 1
    if i == 2 then { next }
    for c in "ab" {
        if c == "b" then { break }
    }
}

label := match total
    if 45 -> "expected",
    if 0 -> "empty"

point := type(x, y)
config := map { "depth": 2, "name": label }
export total, evens, label
"#;

fn decode(bc: &ProgramBc) -> Vec<Instruction> {
    bc.decode().expect("compiled code decodes")
}

fn target(bc: &ProgramBc, ins: &Instruction) -> usize {
    bc.jump_target(ins.jump_slot().expect("jump instruction"))
        .expect("slot exists")
}

/// Pairs each START_LOOP with its END_LOOP, by instruction index.
fn loop_pairs(ins: &[Instruction]) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut pairs = Vec::new();
    for (i, instr) in ins.iter().enumerate() {
        match instr.opcode {
            Opcode::StartLoop => open.push(i),
            Opcode::EndLoop => pairs.push((open.pop().expect("balanced loops"), i)),
            _ => {}
        }
    }
    assert!(open.is_empty());
    pairs
}

#[test]
fn test_program_compiles() {
    let bc = compile_source(PROGRAM).unwrap();
    assert!(!bc.code.is_empty());
    assert_eq!(loop_pairs(&decode(&bc)).len(), 3);
}

#[test]
fn test_every_jump_lands_on_an_instruction_boundary() {
    let bc = compile_source(PROGRAM).unwrap();
    let ins = decode(&bc);

    let mut boundaries: BTreeSet<usize> = ins.iter().map(|i| i.offset).collect();
    boundaries.insert(bc.code.len());

    for instr in ins.iter().filter(|i| i.opcode.is_jump()) {
        let to = target(&bc, instr);
        assert!(
            boundaries.contains(&to),
            "{} at {} jumps into the middle of an instruction ({})",
            instr.opcode,
            instr.offset,
            to
        );
    }
}

#[test]
fn test_loop_edges_target_loop_boundaries() {
    let bc = compile_source(PROGRAM).unwrap();
    let ins = decode(&bc);

    for (start, end) in loop_pairs(&ins) {
        let top = ins[start + 1].offset;
        let exit = ins[end].offset;

        // the back edge is the jump right before END_LOOP
        let back = &ins[end - 1];
        assert_eq!(back.opcode, Opcode::Jump);
        assert_eq!(target(&bc, back), top);

        // the exit test is the first jump of the loop
        let test = ins[start + 1..end]
            .iter()
            .find(|i| i.opcode.is_jump())
            .expect("loop has an exit test");
        assert!(matches!(test.opcode, Opcode::JumpUnless | Opcode::AdvIterFor));
        assert_eq!(target(&bc, test), exit);
    }
}

#[test]
fn test_loop_edges_resolve_past_one_byte() {
    let mut source = String::from("i := 0\nwhile i < 500 {\n    i = i + 1\n");
    for n in 0..200 {
        source.push_str(&format!("    if i == {} then {{ hits = hits + 1 }}\n", n));
    }
    source.push_str("}\n");

    let bc = compile_source(&source).unwrap();
    assert!(bc.code.len() > 255);
    assert!(bc.jumps.len() > 255);

    let ins = decode(&bc);
    let pairs = loop_pairs(&ins);
    assert_eq!(pairs.len(), 1);
    let (start, end) = pairs[0];

    let back = &ins[end - 1];
    assert_eq!(back.opcode, Opcode::Jump);
    assert!(back.offset > 255);
    assert!(back.jump_slot().unwrap() > 255);
    assert_eq!(target(&bc, back), ins[start + 1].offset);

    let exit = ins[start + 1..end]
        .iter()
        .find(|i| i.opcode == Opcode::JumpUnless)
        .expect("loop has an exit test");
    assert_eq!(target(&bc, exit), ins[end].offset);
    assert!(ins[end].offset > 255);
}

#[test]
fn test_multi_line_collections_compile() {
    let source = "xs := [\n    1,\n    2,\n]\nm := map {\n    \"a\": 1\n}\nf(\n    xs,\n    m\n)\n";
    let bc = compile_source(source).unwrap();
    assert_eq!(
        bc.names,
        vec!["xs".to_string(), "m".to_string(), "f".to_string()]
    );
}

#[test]
fn test_for_loop_is_wrapped_in_iterator_instructions() {
    let bc = compile_source("for x in xs { x }").unwrap();
    let ins = decode(&bc);
    assert_eq!(ins[1].opcode, Opcode::PushIter);
    assert_eq!(ins.last().map(|i| i.opcode), Some(Opcode::PopIter));
}

#[test]
fn test_names_are_pooled_and_constants_are_not() {
    let bc = compile_source("a := 1\na = a + 1\nb := a").unwrap();
    assert_eq!(bc.names, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(bc.constants, vec![Value::Number(1.0), Value::Number(1.0)]);
}

#[test]
fn test_export_order() {
    let bc = compile_source("export a, b").unwrap();
    let exported: Vec<&str> = decode(&bc)
        .iter()
        .filter(|i| i.opcode == Opcode::Export)
        .map(|i| bc.names[i.operands[0]].as_str())
        .collect();
    assert_eq!(exported, vec!["a", "b"]);
}

#[test]
fn test_export_expression_is_rejected() {
    let err = compile_source("export 1 + 2").unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(CompileError::MalformedExport { .. })
    ));
}

#[test]
fn test_break_outside_loop_is_rejected() {
    let err = compile_source("x := 1\nbreak").unwrap_err();
    match err {
        Error::Compile(CompileError::LoopControlOutsideLoop { keyword, line, .. }) => {
            assert_eq!(keyword, "break");
            assert_eq!(line, 2);
        }
        other => panic!("expected LoopControlOutsideLoop, got {:?}", other),
    }
}

#[test]
fn test_all_parse_errors_are_reported() {
    let err = parse_source("a := )\n{ b := 1\n c := ]\n d := 2 }\ne := 1.2.3").unwrap_err();
    let Error::Parse(errors) = err else {
        panic!("expected parse errors");
    };
    let kinds: Vec<ParseErrorKind> = errors.0.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ParseErrorKind::UnexpectedToken,
            ParseErrorKind::UnexpectedToken,
            ParseErrorKind::InvalidNumber,
        ]
    );
    let lines: Vec<usize> = errors.0.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![1, 3, 5]);
}

#[test]
fn test_lexer_error_surfaces() {
    let err = compile_source("x := \"open").unwrap_err();
    assert!(matches!(err, Error::Lex(_)));
    assert!(err.to_string().starts_with("lexer error: 1:6:"));
}

#[test]
fn test_compiled_program_survives_postcard() {
    let bc = compile_source(PROGRAM).unwrap();
    let bytes = bc.to_bytes().unwrap();
    let restored = ProgramBc::from_bytes(&bytes).unwrap();
    assert_eq!(restored, bc);
    assert_eq!(decode(&restored).len(), decode(&bc).len());
}
