//! Periodic table lookup
//!
//! Symbols with Pauling electronegativities. Elements without a tabulated
//! value (noble gases, super-heavy elements) carry `None`.

/// A chemical element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub atomic_number: u8,
    pub electronegativity: Option<f64>,
}

macro_rules! elements {
    ($(($z:expr, $sym:expr, $x:expr)),* $(,)?) => {
        &[$(Element { symbol: $sym, atomic_number: $z, electronegativity: $x }),*]
    };
}

static ELEMENTS: &[Element] = elements![
    (1, "H", Some(2.20)), (2, "He", None), (3, "Li", Some(0.98)), (4, "Be", Some(1.57)),
    (5, "B", Some(2.04)), (6, "C", Some(2.55)), (7, "N", Some(3.04)), (8, "O", Some(3.44)),
    (9, "F", Some(3.98)), (10, "Ne", None), (11, "Na", Some(0.93)), (12, "Mg", Some(1.31)),
    (13, "Al", Some(1.61)), (14, "Si", Some(1.90)), (15, "P", Some(2.19)), (16, "S", Some(2.58)),
    (17, "Cl", Some(3.16)), (18, "Ar", None), (19, "K", Some(0.82)), (20, "Ca", Some(1.00)),
    (21, "Sc", Some(1.36)), (22, "Ti", Some(1.54)), (23, "V", Some(1.63)), (24, "Cr", Some(1.66)),
    (25, "Mn", Some(1.55)), (26, "Fe", Some(1.83)), (27, "Co", Some(1.88)), (28, "Ni", Some(1.91)),
    (29, "Cu", Some(1.90)), (30, "Zn", Some(1.65)), (31, "Ga", Some(1.81)), (32, "Ge", Some(2.01)),
    (33, "As", Some(2.18)), (34, "Se", Some(2.55)), (35, "Br", Some(2.96)), (36, "Kr", Some(3.00)),
    (37, "Rb", Some(0.82)), (38, "Sr", Some(0.95)), (39, "Y", Some(1.22)), (40, "Zr", Some(1.33)),
    (41, "Nb", Some(1.60)), (42, "Mo", Some(2.16)), (43, "Tc", Some(1.90)), (44, "Ru", Some(2.20)),
    (45, "Rh", Some(2.28)), (46, "Pd", Some(2.20)), (47, "Ag", Some(1.93)), (48, "Cd", Some(1.69)),
    (49, "In", Some(1.78)), (50, "Sn", Some(1.96)), (51, "Sb", Some(2.05)), (52, "Te", Some(2.10)),
    (53, "I", Some(2.66)), (54, "Xe", Some(2.60)), (55, "Cs", Some(0.79)), (56, "Ba", Some(0.89)),
    (57, "La", Some(1.10)), (58, "Ce", Some(1.12)), (59, "Pr", Some(1.13)), (60, "Nd", Some(1.14)),
    (61, "Pm", Some(1.13)), (62, "Sm", Some(1.17)), (63, "Eu", Some(1.20)), (64, "Gd", Some(1.20)),
    (65, "Tb", Some(1.10)), (66, "Dy", Some(1.22)), (67, "Ho", Some(1.23)), (68, "Er", Some(1.24)),
    (69, "Tm", Some(1.25)), (70, "Yb", Some(1.10)), (71, "Lu", Some(1.27)), (72, "Hf", Some(1.30)),
    (73, "Ta", Some(1.50)), (74, "W", Some(2.36)), (75, "Re", Some(1.90)), (76, "Os", Some(2.20)),
    (77, "Ir", Some(2.20)), (78, "Pt", Some(2.28)), (79, "Au", Some(2.54)), (80, "Hg", Some(2.00)),
    (81, "Tl", Some(1.62)), (82, "Pb", Some(2.33)), (83, "Bi", Some(2.02)), (84, "Po", Some(2.00)),
    (85, "At", Some(2.20)), (86, "Rn", Some(2.20)), (87, "Fr", Some(0.70)), (88, "Ra", Some(0.90)),
    (89, "Ac", Some(1.10)), (90, "Th", Some(1.30)), (91, "Pa", Some(1.50)), (92, "U", Some(1.38)),
    (93, "Np", Some(1.36)), (94, "Pu", Some(1.28)), (95, "Am", Some(1.13)), (96, "Cm", Some(1.28)),
    (97, "Bk", Some(1.30)), (98, "Cf", Some(1.30)), (99, "Es", Some(1.30)), (100, "Fm", Some(1.30)),
    (101, "Md", Some(1.30)), (102, "No", Some(1.30)), (103, "Lr", None), (104, "Rf", None),
    (105, "Db", None), (106, "Sg", None), (107, "Bh", None), (108, "Hs", None),
    (109, "Mt", None), (110, "Ds", None), (111, "Rg", None), (112, "Cn", None),
    (113, "Nh", None), (114, "Fl", None), (115, "Mc", None), (116, "Lv", None),
    (117, "Ts", None), (118, "Og", None),
];

/// Look up an element by symbol (case-sensitive)
pub fn lookup(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Returns true if `symbol` is a known element symbol
pub fn is_element(symbol: &str) -> bool {
    lookup(symbol).is_some()
}

/// Electronegativity used for formula ordering; untabulated sorts last
pub fn ordering_electronegativity(symbol: &str) -> f64 {
    lookup(symbol)
        .and_then(|e| e.electronegativity)
        .unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("Fe").map(|e| e.atomic_number), Some(26));
        assert!(is_element("O"));
        assert!(!is_element("Xx"));
        assert!(!is_element("fe"));
    }

    #[test]
    fn test_table_is_complete() {
        assert_eq!(ELEMENTS.len(), 118);
        for (i, e) in ELEMENTS.iter().enumerate() {
            assert_eq!(e.atomic_number as usize, i + 1);
        }
    }

    #[test]
    fn test_noble_gas_orders_last() {
        assert!(ordering_electronegativity("He") > ordering_electronegativity("F"));
    }
}
