use crate::*;
use sarch32::Instruction;

fn linker_script_for(addr: u32) -> String {
    format!("section text({})\n", addr)
}

#[test]
fn assembles_sum_one_to_ten_with_backward_branch() {
    let source = "\
.section text
movi r0, #0
movi r1, #1
$loop:
add r0, r1
addi r1, #1
cmpi r1, #11
bir.ne $loop
svc #0
";
    let object = assemble_str(source, &linker_script_for(0x1000)).unwrap();
    let section = object.section("text").unwrap();
    assert_eq!(section.start_addr, 0x1000);
    assert_eq!(section.size(), 4 * 7);

    let words: Vec<u32> = section
        .data
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let branch = Instruction::decode(words[5]).unwrap();
    match branch.kind {
        sarch32::InstructionKind::Branch { relative: true, target } => {
            assert_eq!(target.as_immediate(), Some(-0x10));
        }
        other => panic!("expected a relative branch, got {:?}", other),
    }
}

#[test]
fn forward_and_backward_references_resolve_to_the_same_address() {
    let source = "\
.section text
bi $target
nop
$target:
svc #0
";
    let object = assemble_str(source, &linker_script_for(0x2000)).unwrap();
    let section = object.section("text").unwrap();
    let first = u32::from_le_bytes(section.data[0..4].try_into().unwrap());
    let branch = Instruction::decode(first).unwrap();
    match branch.kind {
        sarch32::InstructionKind::Branch { relative: false, target } => {
            assert_eq!(target.as_immediate(), Some(0x2008));
        }
        other => panic!("expected an absolute branch, got {:?}", other),
    }
}

#[test]
fn assembler_invariant_section_size_is_4n_plus_d() {
    let source = "\
.section text
nop
nop
db #1
dw #2
asciz 'hi'
";
    let object = assemble_str(source, &linker_script_for(0x1000)).unwrap();
    let section = object.section("text").unwrap();
    // N = 2 instructions (8 bytes), D = 1 + 4 + 3 ('h','i',NUL) = 8 bytes.
    assert_eq!(section.size(), 4 * 2 + 8);
}

#[test]
fn db_symbol_fixup_stores_only_the_low_byte() {
    let source = "\
.section text
db $target
$target:
nop
";
    let object = assemble_str(source, &linker_script_for(0x1200)).unwrap();
    let section = object.section("text").unwrap();
    assert_eq!(section.data[0], 0x01); // low byte of 0x1201
}

#[test]
fn dw_symbol_fixup_stores_the_full_address() {
    let source = "\
.section text
dw $target
$target:
nop
";
    let object = assemble_str(source, &linker_script_for(0x3000)).unwrap();
    let section = object.section("text").unwrap();
    let word = u32::from_le_bytes(section.data[0..4].try_into().unwrap());
    assert_eq!(word, 0x3004);
}

#[test]
fn undefined_symbol_is_a_fatal_link_error() {
    let source = ".section text\nbi $nowhere\n";
    let err = assemble_str(source, &linker_script_for(0x1000)).unwrap_err();
    match err {
        AssembleError::UndefinedSymbol { symbol } => assert_eq!(symbol, "nowhere"),
        other => panic!("expected UndefinedSymbol, got {:?}", other),
    }
}

#[test]
fn section_with_no_linker_entry_is_a_fatal_link_error() {
    let source = ".section mystery\nnop\n";
    let err = assemble_str(source, "section text(0x1000)\n").unwrap_err();
    match err {
        AssembleError::MissingSection { section } => assert_eq!(section, "mystery"),
        other => panic!("expected MissingSection, got {:?}", other),
    }
}

#[test]
fn malformed_line_is_skipped_and_contributes_no_bytes() {
    let source = "\
.section text
nop
this is not valid at all
nop
";
    let object = assemble_str(source, &linker_script_for(0x1000)).unwrap();
    let section = object.section("text").unwrap();
    assert_eq!(section.size(), 8);
}

#[test]
fn default_section_is_data() {
    let source = "db #7\n";
    let object = assemble_str(source, "section data(0x5000)\n").unwrap();
    let section = object.section("data").unwrap();
    assert_eq!(section.data, vec![7]);
}

#[test]
fn sum_one_to_ten_scenario_runs_through_assemble_then_load_then_execute() {
    let source = "\
.section text
movi r0, #0
movi r1, #1
$loop:
add r0, r1
addi r1, #1
cmpi r1, #11
bi.ne $loop
svc #0
";
    let object = assemble_str(source, &linker_script_for(sarch32::constants::RESET_VECTOR)).unwrap();

    let mut machine = sarch32::Machine::new(1 << 20);
    machine.load_object(&object).unwrap();

    for _ in 0..200 {
        if machine.cpu.last_exception().is_some() {
            break;
        }
        machine.step(8, false).unwrap();
    }

    assert_eq!(machine.cpu.reg(sarch32::RegisterId::R0), 55);
    assert_eq!(machine.cpu.reg(sarch32::RegisterId::R1), 11);
    assert_eq!(
        machine.cpu.last_exception(),
        Some(sarch32::Exception::SupervisorCall(0))
    );
}

#[test]
fn multiple_input_files_share_one_symbol_table() {
    let a = ".section text\nbi $entry\n";
    let b = ".section text\n$entry:\nsvc #0\n";
    let object = assemble(
        vec![("a.sasm", a), ("b.sasm", b)],
        &linker_script_for(0x1000),
    )
    .unwrap();
    let section = object.section("text").unwrap();
    let first = u32::from_le_bytes(section.data[0..4].try_into().unwrap());
    let branch = Instruction::decode(first).unwrap();
    match branch.kind {
        sarch32::InstructionKind::Branch { target, .. } => {
            assert_eq!(target.as_immediate(), Some(0x1004))
        }
        other => panic!("expected a branch, got {:?}", other),
    }
}
