use std::collections::BTreeSet;
use std::fmt::Write;

use crate::bytecode::ProgramBc;
use crate::bytecode::op::{Instruction, Opcode};

/// Print disassembly of a bytecode program
pub fn print_bc(bc: &ProgramBc) {
    print!("{}", disassemble(bc));
}

/// Render a bytecode program: the instruction listing followed by the
/// constant, name and jump tables.
pub fn disassemble(bc: &ProgramBc) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_program(&mut out, bc);
    out
}

fn write_program(out: &mut String, bc: &ProgramBc) -> std::fmt::Result {
    writeln!(out, "=== BYTECODE PROGRAM ===")?;
    writeln!(out)?;

    let mut instructions = Vec::new();
    let mut decode_error = None;
    for item in bc.instructions() {
        match item {
            Ok(ins) => instructions.push(ins),
            Err(e) => {
                decode_error = Some(e);
                break;
            }
        }
    }

    writeln!(out, "════════════════════════════════════════")?;
    writeln!(out, " main")?;
    writeln!(
        out,
        " {} instructions, {} bytes",
        instructions.len(),
        bc.code.len()
    )?;
    writeln!(out, "════════════════════════════════════════")?;

    let jump_targets = collect_jump_targets(bc);

    for ins in &instructions {
        let is_target = jump_targets.contains(&ins.offset);
        if is_target {
            writeln!(out, "      ┌──────────────────────────────────")?;
        }
        write!(out, "{:04} {}", ins.offset, if is_target { "► " } else { "  " })?;
        write_instruction(out, bc, ins)?;
        writeln!(out)?;
    }

    if jump_targets.contains(&bc.code.len()) {
        writeln!(out, "      ┌──────────────────────────────────")?;
        writeln!(out, "{:04} ► (end)", bc.code.len())?;
    }

    if let Some(e) = decode_error {
        writeln!(out, "!! {}", e)?;
    }

    writeln!(out)?;
    write_tables(out, bc)
}

fn collect_jump_targets(bc: &ProgramBc) -> BTreeSet<usize> {
    bc.instructions()
        .filter_map(Result::ok)
        .filter_map(|ins| ins.jump_slot())
        .filter_map(|slot| bc.jump_target(slot))
        .collect()
}

fn write_instruction(out: &mut String, bc: &ProgramBc, ins: &Instruction) -> std::fmt::Result {
    if ins.operands.is_empty() {
        return write!(out, "{}", ins.opcode.mnemonic());
    }
    write!(out, "{:<16}", ins.opcode.mnemonic())?;

    match ins.opcode {
        Opcode::LoadConst => {
            let idx = ins.operands[0];
            match bc.constants.get(idx) {
                Some(value) => write!(out, " {} ({})", idx, value),
                None => write!(out, " {} (?)", idx),
            }
        }

        Opcode::LoadName | Opcode::StoreName | Opcode::DeclareName | Opcode::Export => {
            write_name(out, bc, ins.operands[0])
        }

        Opcode::Jump | Opcode::JumpIf | Opcode::JumpUnless => write_jump(out, bc, ins),

        Opcode::AdvIterFor => {
            write_name(out, bc, ins.operands[0])?;
            write_jump(out, bc, ins)
        }

        Opcode::CallFunction | Opcode::CallMethod => write!(out, " argc={}", ins.operands[0]),

        _ => write!(out, " n={}", ins.operands[0]),
    }
}

fn write_name(out: &mut String, bc: &ProgramBc, idx: usize) -> std::fmt::Result {
    match bc.names.get(idx) {
        Some(name) => write!(out, " {} ({})", idx, name),
        None => write!(out, " {} (?)", idx),
    }
}

fn write_jump(out: &mut String, bc: &ProgramBc, ins: &Instruction) -> std::fmt::Result {
    let Some(slot) = ins.jump_slot() else {
        return Ok(());
    };
    match bc.jump_target(slot) {
        Some(target) => {
            let direction = if target <= ins.offset { "↑" } else { "↓" };
            write!(out, " #{} {} (→ {:04})", slot, direction, target)
        }
        None => write!(out, " #{} (unresolved)", slot),
    }
}

fn write_tables(out: &mut String, bc: &ProgramBc) -> std::fmt::Result {
    writeln!(out, "constants:")?;
    for (i, value) in bc.constants.iter().enumerate() {
        writeln!(out, "  {:>4}  {}", i, value)?;
    }
    writeln!(out, "names:")?;
    for (i, name) in bc.names.iter().enumerate() {
        writeln!(out, "  {:>4}  {}", i, name)?;
    }
    writeln!(out, "jumps:")?;
    for (i, target) in bc.jumps.iter().enumerate() {
        writeln!(out, "  {:>4}  → {:04}", i, target)?;
    }
    Ok(())
}
