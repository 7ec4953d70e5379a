use crate::error::TilepartError;
use crate::hw::GpuFamily;
use crate::isa::InstructionSet;
use crate::xe_hp::XeHpCore;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;

/// Instruction sets by GPU family.
///
/// Callers own the registry and pass it explicitly, there is no global
/// table of families.
#[derive(Default)]
pub struct Registry {
    families: BTreeMap<GpuFamily, Box<dyn InstructionSet>>,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.families.keys()).finish()
    }
}

impl Registry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Registry {
        Registry {
            families: BTreeMap::new(),
        }
    }

    /// Registry with every instruction set this crate implements
    #[must_use]
    pub fn with_default_families() -> Registry {
        let mut registry = Registry::new();
        registry.register(Box::new(XeHpCore));
        registry
    }

    /// Add instruction set, replaces previous one for the same family
    pub fn register(&mut self, isa: Box<dyn InstructionSet>) {
        self.families.insert(isa.family(), isa);
    }

    /// Instruction set for `family`
    pub fn get(&self, family: GpuFamily) -> Result<&dyn InstructionSet, TilepartError> {
        self.families
            .get(&family)
            .map(|isa| &**isa)
            .ok_or(TilepartError::UnsupportedFamily(family))
    }
}

#[test]
fn empty_registry_rejects_family() {
    let registry = Registry::new();
    assert!(matches!(
        registry.get(GpuFamily::XeHpCore),
        Err(TilepartError::UnsupportedFamily(GpuFamily::XeHpCore))
    ));
    let registry = Registry::with_default_families();
    assert_eq!(registry.get(GpuFamily::XeHpCore).unwrap().family(), GpuFamily::XeHpCore);
}
