mod flags;
mod random;

use tilepart_core::error::TilepartError;
use tilepart_core::hw::GpuFamily;
use tilepart_core::isa::{iter_commands, InstructionSet};
use tilepart_core::registry::Registry;

/// Every record before the control section decodes, the control section
/// is zeroed and every record after it decodes too.
fn check_layout(
    isa: &dyn InstructionSet,
    bytes: &[u8],
    control_section_offset: usize,
    control_section_size: usize,
) -> Result<(), TilepartError> {
    let mut commands = iter_commands(isa, bytes);
    while commands.offset() < control_section_offset {
        match commands.next() {
            Some(record) => {
                record?;
            }
            None => break,
        }
    }
    if commands.offset() != control_section_offset {
        panic!(
            "Records end at {}, but control section starts at {control_section_offset}.",
            commands.offset()
        );
    }
    let control_section = &bytes[control_section_offset..control_section_offset + control_section_size];
    if control_section.iter().any(|b| *b != 0) {
        panic!("Control section {control_section:?} at {control_section_offset} is not zeroed.");
    }
    commands.skip_bytes(control_section_size);
    for record in commands {
        record?;
    }
    Ok(())
}

fn run_test_fn<F: Fn(&dyn InstructionSet) -> Result<(), TilepartError>>(test_fn: F, isa: &dyn InstructionSet) {
    println!();
    let name = std::any::type_name::<F>();
    print!("Running test {name} for {:?} ... ", isa.family());
    let begin = std::time::Instant::now();
    let res = test_fn(isa);
    let elapsed = begin.elapsed().as_nanos();
    res.unwrap_or_else(|err| panic!("Test {name} failed with error {err}"));
    println!("OK, time taken: {:.3} ms", elapsed as f32 / 1000000.);
}

macro_rules! run_test {
    ( $registry:expr, $test:expr ) => {
        {
            for family in [GpuFamily::XeHpCore] {
                let isa = $registry.get(family).unwrap();
                run_test_fn($test, isa);
            }
        }
    }
}

fn main() {
    let registry = Registry::with_default_families();
    println!("\nTesting dynamic partitioning");
    run_test!(registry, flags::dynamic);
    println!("\nTesting static partitioning");
    run_test!(registry, flags::static_partition);
    println!("\nTesting barriers");
    run_test!(registry, flags::barrier);
    println!("\nTesting selected partitions");
    run_test!(registry, random::selected_walkers);
    run_test!(registry, random::exact_capacity);
}
