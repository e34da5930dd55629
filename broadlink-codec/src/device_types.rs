//! Static catalog of Broadlink device-type codes.
//!
//! Discovery replies carry a 16-bit device-type code. The table maps each
//! code we have seen in the wild to a capability record; everything else is
//! unknown and rejected.

/// Capabilities derived from a device-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceKind {
    /// The code is present in the table.
    pub known: bool,
    /// We can drive this hardware.
    pub supported: bool,
    /// Human-readable model label.
    pub name: &'static str,
    /// Transmits infrared codes.
    pub ir: bool,
    /// Transmits radio-frequency codes.
    pub rf: bool,
    /// Switchable power outlet.
    pub power: bool,
}

const fn power(name: &'static str) -> DeviceKind {
    DeviceKind {
        known: true,
        supported: true,
        name,
        ir: false,
        rf: false,
        power: true,
    }
}

const fn ir(name: &'static str) -> DeviceKind {
    DeviceKind {
        known: true,
        supported: true,
        name,
        ir: true,
        rf: false,
        power: false,
    }
}

const fn ir_rf(name: &'static str) -> DeviceKind {
    DeviceKind {
        known: true,
        supported: true,
        name,
        ir: true,
        rf: true,
        power: false,
    }
}

const fn unsupported(name: &'static str) -> DeviceKind {
    DeviceKind {
        known: true,
        supported: false,
        name,
        ir: false,
        rf: false,
        power: false,
    }
}

const UNKNOWN: DeviceKind = DeviceKind {
    known: false,
    supported: false,
    name: "Unknown",
    ir: false,
    rf: false,
    power: false,
};

/// Look up the capability record for a device-type code.
pub fn lookup(device_type: u16) -> DeviceKind {
    match device_type {
        0x0000 => power("SP1"),
        0x2711 => power("SP2"),
        0x2719 | 0x7919 | 0x271a | 0x791a => power("Honeywell SP2"),
        0x2720 => power("SPMini"),
        0x753e => power("SP3"),
        0x7d00 => power("OEM branded SP3"),
        0x947a | 0x9479 => power("SP3S"),
        0x2728 => power("SPMini2"),
        0x2733 | 0x273e => power("OEM branded SPMini"),
        0x7530 | 0x7546 | 0x7918 => power("OEM branded SPMini2"),
        0x2736 => power("SPMiniPlus"),
        0x2712 => ir("RM2"),
        0x2737 => ir("RM Mini"),
        0x273d => ir("RM Pro Phicomm"),
        0x2783 => ir("RM2 Home Plus"),
        0x277c => ir("RM2 Home Plus GDT"),
        0x278f => ir("RM Mini Shate"),
        0x272a => ir_rf("RM2 Pro Plus"),
        0x2787 => ir_rf("RM2 Pro Plus 2"),
        0x279d => ir_rf("RM2 Pro Plus 3"),
        0x27a9 => ir_rf("RM2 Pro Plus 300"),
        0x278b => ir_rf("RM2 Pro Plus BL"),
        0x2797 => ir_rf("RM2 Pro Plus HYC"),
        0x27a1 => ir_rf("RM2 Pro Plus R1"),
        0x27a6 => ir_rf("RM2 Pro PP"),
        0x2714 => unsupported("A1 environment sensor"),
        0x4eb5 => unsupported("MP1 power strip"),
        0x2722 => unsupported("S1 SmartOne alarm kit"),
        0x4e4d => unsupported("Dooya DT360E curtain motor"),
        0x4ead => unsupported("Hysen heating controller"),
        _ => UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blaster_capabilities() {
        let kind = lookup(0x2787);
        assert!(kind.known && kind.supported);
        assert!(kind.ir && kind.rf);
        assert!(!kind.power);

        let kind = lookup(0x2737);
        assert!(kind.ir);
        assert!(!kind.rf);
    }

    #[test]
    fn test_outlet_capabilities() {
        let kind = lookup(0x753e);
        assert_eq!(kind.name, "SP3");
        assert!(kind.power);
        assert!(!kind.ir && !kind.rf);
    }

    #[test]
    fn test_known_but_unsupported() {
        let kind = lookup(0x2714);
        assert!(kind.known);
        assert!(!kind.supported);
    }

    #[test]
    fn test_unknown_code() {
        let kind = lookup(0xbeef);
        assert!(!kind.known);
        assert!(!kind.supported);
        assert_eq!(kind.name, "Unknown");
    }
}
