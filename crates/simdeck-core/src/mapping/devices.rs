//! Component kind table: pin order, parameter filtering and emitters per kind

use crate::config::Dialect;
use crate::emit::{directives, spice, verilog_a, EmitFn};
use crate::mapping::nets::NetNames;
use crate::mapping::values::QuantityKind;
use crate::parser::Component;

/// Everything the emitter needs to know about one component kind
#[derive(Debug, Clone, Copy)]
pub struct DeviceInfo {
    /// Schematic model identifier ("R", "_BJT", ".AC", …)
    pub model: &'static str,
    /// SPICE element letter
    pub prefix: &'static str,
    /// Schematic port index for each emitted pin, in instance-line order
    pub pin_order: &'static [usize],
    /// Main value property and its quantity
    pub value: Option<(&'static str, QuantityKind)>,
    /// Recognized parameters, in emission order
    pub params: &'static [&'static str],
    /// Parameters written on the instance line instead of the model card
    pub instance_params: &'static [&'static str],
    /// Parameters a dialect does not understand
    pub incompatible: &'static [(Dialect, &'static [&'static str])],
    /// Per-dialect parameter spellings
    pub renames: &'static [(Dialect, &'static str, &'static str)],
    pub spice: Option<EmitFn>,
    pub verilog_a: Option<EmitFn>,
}

const fn kind(model: &'static str, prefix: &'static str, pin_order: &'static [usize]) -> DeviceInfo {
    DeviceInfo {
        model,
        prefix,
        pin_order,
        value: None,
        params: &[],
        instance_params: &[],
        incompatible: &[],
        renames: &[],
        spice: None,
        verilog_a: None,
    }
}

const fn directive(model: &'static str, emit: EmitFn) -> DeviceInfo {
    DeviceInfo {
        spice: Some(emit),
        ..kind(model, ".", &[])
    }
}

const DIODE_PARAMS: &[&str] = &[
    "Is", "N", "Cj0", "M", "Vj", "Fc", "Cp", "Isr", "Nr", "Rs", "Tt", "Ikf", "Kf", "Af", "Ffe",
    "Bv", "Ibv", "Temp", "Xti", "Eg", "Tbv", "Trs", "Ttt1", "Ttt2", "Tm1", "Tm2", "Tnom", "Area",
];

const BJT_PARAMS: &[&str] = &[
    "Is", "Nf", "Nr", "Ikf", "Ikr", "Vaf", "Var", "Ise", "Ne", "Isc", "Nc", "Bf", "Br", "Rbm",
    "Irb", "Rc", "Re", "Rb", "Cje", "Vje", "Mje", "Cjc", "Vjc", "Mjc", "Xcjc", "Cjs", "Vjs",
    "Mjs", "Fc", "Tf", "Xtf", "Vtf", "Itf", "Tr", "Temp", "Kf", "Af", "Ffe", "Kb", "Ab", "Fb",
    "Ptf", "Xtb", "Xti", "Eg", "Tnom", "Area",
];

const MOSFET_PARAMS: &[&str] = &[
    "Vt0", "Kp", "Gamma", "Phi", "Lambda", "Rd", "Rs", "Rsh", "Is", "N", "W", "L", "Ld", "Tox",
    "Cgso", "Cgdo", "Cgbo", "Cbd", "Cbs", "Pb", "Mj", "Fc", "Cjsw", "Mjsw", "Tt", "Nsub", "Nss",
    "Tpg", "Uo", "Rg", "Kf", "Af", "Ffe", "Temp", "Tnom", "Ad", "As", "Pd", "Ps", "Nrd", "Nrs",
];

const JFET_PARAMS: &[&str] = &[
    "Vt0", "Beta", "Lambda", "Rd", "Rs", "Is", "N", "Isr", "Nr", "Cgs", "Cgd", "Pb", "Fc", "M",
    "Kf", "Af", "Ffe", "Temp", "Xti", "Vt0tc", "Betatce", "Tnom", "Area",
];

/// `Vt0` is spelled `Vto` by ngspice and `VTO` by Xyce
const THRESHOLD_RENAMES: &[(Dialect, &str, &str)] = &[
    (Dialect::Ngspice, "Vt0", "Vto"),
    (Dialect::SpiceOpus, "Vt0", "Vto"),
    (Dialect::Xyce, "Vt0", "VTO"),
];

static DEVICES: &[DeviceInfo] = &[
    DeviceInfo {
        value: Some(("R", QuantityKind::Resistance)),
        params: &["Temp", "Tc1", "Tc2", "Tnom"],
        instance_params: &["Temp", "Tc1", "Tc2"],
        incompatible: &[
            (Dialect::Ngspice, &["Tnom"]),
            (Dialect::Xyce, &["Tnom"]),
            (Dialect::SpiceOpus, &["Tnom"]),
            (Dialect::Cdl, &["Temp", "Tc1", "Tc2", "Tnom"]),
        ],
        spice: Some(spice::emit_passive),
        verilog_a: Some(verilog_a::emit_passive),
        ..kind("R", "R", &[0, 1])
    },
    DeviceInfo {
        value: Some(("C", QuantityKind::Capacitance)),
        params: &["V"],
        instance_params: &["V"],
        incompatible: &[(Dialect::Cdl, &["V"])],
        renames: &[
            (Dialect::Ngspice, "V", "IC"),
            (Dialect::Xyce, "V", "IC"),
            (Dialect::SpiceOpus, "V", "IC"),
        ],
        spice: Some(spice::emit_passive),
        verilog_a: Some(verilog_a::emit_passive),
        ..kind("C", "C", &[0, 1])
    },
    DeviceInfo {
        value: Some(("L", QuantityKind::Inductance)),
        params: &["I"],
        instance_params: &["I"],
        incompatible: &[(Dialect::Cdl, &["I"])],
        renames: &[
            (Dialect::Ngspice, "I", "IC"),
            (Dialect::Xyce, "I", "IC"),
            (Dialect::SpiceOpus, "I", "IC"),
        ],
        spice: Some(spice::emit_passive),
        verilog_a: Some(verilog_a::emit_passive),
        ..kind("L", "L", &[0, 1])
    },
    kind("GND", "", &[]),
    kind("Port", "", &[]),
    DeviceInfo {
        value: Some(("U", QuantityKind::Voltage)),
        spice: Some(spice::emit_dc_source),
        verilog_a: Some(verilog_a::emit_source),
        ..kind("Vdc", "V", &[0, 1])
    },
    DeviceInfo {
        value: Some(("I", QuantityKind::Current)),
        spice: Some(spice::emit_dc_source),
        verilog_a: Some(verilog_a::emit_source),
        ..kind("Idc", "I", &[0, 1])
    },
    DeviceInfo {
        value: Some(("U", QuantityKind::Voltage)),
        spice: Some(spice::emit_sine_source),
        ..kind("Vac", "V", &[0, 1])
    },
    DeviceInfo {
        value: Some(("I", QuantityKind::Current)),
        spice: Some(spice::emit_sine_source),
        ..kind("Iac", "I", &[0, 1])
    },
    DeviceInfo {
        value: Some(("U", QuantityKind::Voltage)),
        spice: Some(spice::emit_sine_source),
        ..kind("Vsin", "V", &[0, 1])
    },
    DeviceInfo {
        spice: Some(spice::emit_pulse_source),
        ..kind("Vpulse", "V", &[0, 1])
    },
    DeviceInfo {
        params: DIODE_PARAMS,
        instance_params: &["Area", "Temp"],
        incompatible: &[
            (Dialect::Ngspice, &["Cp", "Ffe", "Tbv", "Trs", "Ttt1", "Ttt2", "Tm1", "Tm2"]),
            (Dialect::SpiceOpus, &["Cp", "Ffe", "Tbv", "Trs", "Ttt1", "Ttt2", "Tm1", "Tm2"]),
            (
                Dialect::Xyce,
                &["Cp", "Ffe", "Isr", "Nr", "Tbv", "Trs", "Ttt1", "Ttt2", "Tm1", "Tm2"],
            ),
            (Dialect::Cdl, &["Temp"]),
        ],
        renames: &[
            (Dialect::Ngspice, "Cj0", "Cjo"),
            (Dialect::SpiceOpus, "Cj0", "Cjo"),
            (Dialect::Xyce, "Cj0", "CJO"),
        ],
        spice: Some(spice::emit_semiconductor),
        ..kind("Diode", "D", &[1, 0])
    },
    DeviceInfo {
        params: BJT_PARAMS,
        instance_params: &["Area", "Temp"],
        incompatible: &[
            (Dialect::Ngspice, &["Ffe", "Kb", "Ab", "Fb"]),
            (Dialect::SpiceOpus, &["Ffe", "Kb", "Ab", "Fb"]),
            (Dialect::Xyce, &["Ffe", "Kb", "Ab", "Fb", "Ptf"]),
            (Dialect::Cdl, &["Temp"]),
        ],
        spice: Some(spice::emit_semiconductor),
        ..kind("_BJT", "Q", &[1, 0, 2, 3])
    },
    DeviceInfo {
        params: MOSFET_PARAMS,
        instance_params: &["W", "L", "Ad", "As", "Pd", "Ps", "Nrd", "Nrs", "Temp"],
        incompatible: &[
            (Dialect::Ngspice, &["Rg", "Ffe", "Tt"]),
            (Dialect::SpiceOpus, &["Rg", "Ffe", "Tt"]),
            (Dialect::Xyce, &["Rg", "Ffe", "Tt"]),
            (Dialect::Cdl, &["Temp", "Ad", "As", "Pd", "Ps", "Nrd", "Nrs"]),
        ],
        renames: THRESHOLD_RENAMES,
        spice: Some(spice::emit_semiconductor),
        ..kind("_MOSFET", "M", &[1, 0, 2, 3])
    },
    DeviceInfo {
        params: JFET_PARAMS,
        instance_params: &["Area", "Temp"],
        incompatible: &[
            (Dialect::Ngspice, &["Isr", "Nr", "Ffe", "Xti", "Vt0tc", "Betatce"]),
            (Dialect::SpiceOpus, &["Isr", "Nr", "Ffe", "Xti", "Vt0tc", "Betatce"]),
            (Dialect::Xyce, &["Isr", "Nr", "Ffe", "Xti", "Vt0tc", "Betatce", "M"]),
            (Dialect::Cdl, &["Temp"]),
        ],
        renames: THRESHOLD_RENAMES,
        spice: Some(spice::emit_semiconductor),
        ..kind("JFET", "J", &[1, 0, 2])
    },
    DeviceInfo {
        value: Some(("G", QuantityKind::Any)),
        params: &["T"],
        incompatible: &[
            (Dialect::Ngspice, &["T"]),
            (Dialect::Xyce, &["T"]),
            (Dialect::SpiceOpus, &["T"]),
            (Dialect::Cdl, &["T"]),
        ],
        spice: Some(spice::emit_voltage_controlled),
        verilog_a: Some(verilog_a::emit_controlled),
        ..kind("VCVS", "E", &[1, 2, 0, 3])
    },
    DeviceInfo {
        value: Some(("G", QuantityKind::Conductance)),
        params: &["T"],
        incompatible: &[
            (Dialect::Ngspice, &["T"]),
            (Dialect::Xyce, &["T"]),
            (Dialect::SpiceOpus, &["T"]),
            (Dialect::Cdl, &["T"]),
        ],
        spice: Some(spice::emit_voltage_controlled),
        verilog_a: Some(verilog_a::emit_controlled),
        ..kind("VCCS", "G", &[1, 2, 0, 3])
    },
    // Output pins first, then the controlling branch
    DeviceInfo {
        value: Some(("G", QuantityKind::Any)),
        params: &["T"],
        incompatible: &[
            (Dialect::Ngspice, &["T"]),
            (Dialect::Xyce, &["T"]),
            (Dialect::SpiceOpus, &["T"]),
            (Dialect::Cdl, &["T"]),
        ],
        spice: Some(spice::emit_current_controlled),
        verilog_a: Some(verilog_a::emit_controlled),
        ..kind("CCCS", "F", &[1, 2, 0, 3])
    },
    DeviceInfo {
        value: Some(("G", QuantityKind::Resistance)),
        params: &["T"],
        incompatible: &[
            (Dialect::Ngspice, &["T"]),
            (Dialect::Xyce, &["T"]),
            (Dialect::SpiceOpus, &["T"]),
            (Dialect::Cdl, &["T"]),
        ],
        spice: Some(spice::emit_current_controlled),
        verilog_a: Some(verilog_a::emit_controlled),
        ..kind("CCVS", "H", &[1, 2, 0, 3])
    },
    DeviceInfo {
        spice: Some(spice::emit_edd),
        verilog_a: Some(verilog_a::emit_edd),
        ..kind("EDD", "B", &[])
    },
    DeviceInfo {
        spice: Some(spice::emit_subcircuit),
        ..kind("Sub", "X", &[])
    },
    DeviceInfo {
        spice: Some(spice::emit_equation),
        verilog_a: Some(verilog_a::emit_equation),
        ..kind("Eqn", "", &[])
    },
    directive(".DC", directives::emit_op),
    directive(".AC", directives::emit_ac),
    directive(".TR", directives::emit_tran),
    directive(".HB", directives::emit_hb),
    directive(".SENS", directives::emit_sens),
    directive(".NOISE", directives::emit_noise),
    directive(".FOUR", directives::emit_four),
    directive(".PZ", directives::emit_pz),
    directive(".SW", directives::emit_sweep),
];

/// Look up a component kind by schematic model
pub fn device_info(model: &str) -> Option<&'static DeviceInfo> {
    DEVICES.iter().find(|d| d.model == model)
}

impl DeviceInfo {
    /// Simulation directives start with a dot
    pub fn is_directive(&self) -> bool {
        self.model.starts_with('.')
    }

    /// Node literals in instance-line order, `None` if a port is missing
    pub fn nodes(&self, component: &Component, nets: &NetNames) -> Option<Vec<String>> {
        self.pin_order
            .iter()
            .map(|&i| component.net(i).map(|net| nets.node(net)))
            .collect()
    }

    pub fn is_incompatible(&self, param: &str, dialect: Dialect) -> bool {
        self.incompatible
            .iter()
            .any(|(d, names)| *d == dialect && names.contains(&param))
    }

    /// Spelling of `param` in `dialect`
    pub fn param_name(&self, param: &'static str, dialect: Dialect) -> &'static str {
        self.renames
            .iter()
            .find(|(d, from, _)| *d == dialect && *from == param)
            .map(|(_, _, to)| *to)
            .unwrap_or(param)
    }

    /// The main value as written, with its quantity
    pub fn raw_value<'c>(&self, component: &'c Component) -> Option<(&'c str, QuantityKind)> {
        let (name, quantity) = self.value?;
        component.property(name).map(|v| (v, quantity))
    }

    /// `(name, raw value)` pairs of the recognized parameters present on the
    /// component, either the instance-line ones or the model-card ones.
    ///
    /// Incompatible parameters are left out and returned separately.
    pub fn split_params<'c>(
        &self,
        component: &'c Component,
        dialect: Dialect,
        instance: bool,
    ) -> (Vec<(&'static str, &'c str)>, Vec<&'static str>) {
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        for &param in self.params {
            if self.instance_params.contains(&param) != instance {
                continue;
            }
            let Some(value) = component.property(param).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            if self.is_incompatible(param, dialect) {
                dropped.push(param);
                continue;
            }
            kept.push((self.param_name(param, dialect), value));
        }
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CircuitGraph;

    #[test]
    fn test_pin_orders() {
        assert_eq!(device_info("_MOSFET").unwrap().pin_order, &[1, 0, 2, 3]);
        assert_eq!(device_info("_BJT").unwrap().pin_order, &[1, 0, 2, 3]);
        assert_eq!(device_info("JFET").unwrap().pin_order, &[1, 0, 2]);
        assert_eq!(device_info("Diode").unwrap().pin_order, &[1, 0]);
        assert_eq!(device_info("VCVS").unwrap().pin_order, &[1, 2, 0, 3]);
        assert!(device_info("Nonexistent").is_none());
        assert!(device_info(".AC").unwrap().is_directive());
    }

    #[test]
    fn test_nodes_reordered_and_ground_rewritten() {
        let m = Component::new("_MOSFET", "M1")
            .port("G", "in")
            .port("D", "out")
            .port("S", "gnd")
            .port("B", "gnd");
        let graph = CircuitGraph {
            title: String::new(),
            components: vec![m.clone()],
        };
        let nets = NetNames::new(&graph, Dialect::Ngspice);
        let nodes = device_info("_MOSFET").unwrap().nodes(&m, &nets).unwrap();
        assert_eq!(nodes, vec!["out", "in", "0", "0"]);

        let short = Component::new("_MOSFET", "M2").port("G", "in");
        assert!(device_info("_MOSFET").unwrap().nodes(&short, &nets).is_none());
    }

    #[test]
    fn test_renames_and_incompatible() {
        let m = Component::new("_MOSFET", "M1")
            .prop("Vt0", "0.7")
            .prop("Rg", "10")
            .prop("W", "10 um")
            .prop("Kp", "");
        let info = device_info("_MOSFET").unwrap();

        let (model, dropped) = info.split_params(&m, Dialect::Ngspice, false);
        assert_eq!(model, vec![("Vto", "0.7")]);
        assert_eq!(dropped, vec!["Rg"]);

        let (model, _) = info.split_params(&m, Dialect::Xyce, false);
        assert_eq!(model, vec![("VTO", "0.7")]);

        let (instance, _) = info.split_params(&m, Dialect::Xyce, true);
        assert_eq!(instance, vec![("W", "10 um")]);
    }
}
