use calcmark_units::{CollisionPolicy, Error, Quantity, UnitKind, UnitRegistry};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn validate_rejects_invalid_syntax() {
    assert!(calcmark_units::validate("m//s").is_err());
    assert!(calcmark_units::validate("kg/(m*s").is_err());
    assert!(calcmark_units::validate("m..s").is_err());
    assert!(calcmark_units::validate("kg*m/s^2").is_ok());
}

#[test]
fn converts_minutes_to_seconds() {
    let reg = UnitRegistry::new();
    let q = Quantity::new(1.0, reg.resolve("min").unwrap());
    let s = reg.convert(&q, "s").unwrap();
    assert_eq!(s.magnitude, 60.0);
    assert_eq!(s.unit_label(), "s");
}

#[test]
fn deciliter_to_liter() {
    let reg = UnitRegistry::new();
    let q = Quantity::new(1.0, reg.resolve("dL").unwrap());
    let l = reg.convert(&q, "L").unwrap();
    assert!(approx(l.magnitude, 0.1));
}

#[test]
fn speed_conversion() {
    let reg = UnitRegistry::new();
    let q = Quantity::new(36.0, reg.resolve("km/h").unwrap());
    let ms = reg.convert(&q, "m/s").unwrap();
    assert!(approx(ms.magnitude, 10.0));
}

#[test]
fn incompatible_conversion_fails() {
    let reg = UnitRegistry::new();
    let q = Quantity::new(1.0, reg.resolve("kg").unwrap());
    assert!(matches!(reg.convert(&q, "m"), Err(Error::Incompatible { .. })));
}

#[test]
fn unknown_units_are_reported_by_name() {
    let reg = UnitRegistry::new();
    assert_eq!(reg.resolve("m/furlong"), Err(Error::UnknownUnit("furlong".into())));
}

#[test]
fn is_unit_covers_prefixed_forms() {
    let reg = UnitRegistry::new();
    for name in ["V", "kV", "mV", "kWh", "µm", "GHz", "kΩ", "kOhm", "Ω"] {
        assert!(reg.is_unit(name), "{name} should be a unit");
    }
    for name in ["x", "Cap", "velocity", "kkg"] {
        assert!(!reg.is_unit(name), "{name} should not be a unit");
    }
}

#[test]
fn product_collapses_to_named_unit() {
    let reg = UnitRegistry::new();
    let mass = Quantity::new(5.0, reg.resolve("kg").unwrap());
    let accel = Quantity::new(9.81, reg.resolve("m/s^2").unwrap());
    let force = reg.simplify(mass.mul(&accel).unwrap());
    assert!(approx(force.magnitude, 49.05));
    assert_eq!(force.unit_label(), "N");
}

#[test]
fn single_written_units_are_not_collapsed() {
    let reg = UnitRegistry::new();
    let energy = Quantity::new(2.0, reg.resolve("kWh").unwrap());
    let same = reg.simplify(energy.clone());
    assert_eq!(same, energy);
}

#[test]
fn collision_policy_reserves_unlisted_units() {
    let reg = UnitRegistry::new();
    assert!(reg.check_symbol_name("m").is_ok());
    assert!(reg.check_symbol_name("F").is_ok());
    assert!(reg.check_symbol_name("x").is_ok());
    assert!(matches!(
        reg.check_symbol_name("V"),
        Err(Error::ReservedName { .. })
    ));
    assert!(matches!(
        reg.check_symbol_name("mm"),
        Err(Error::ReservedName { .. })
    ));

    let strict = UnitRegistry::with_policy(CollisionPolicy::strict());
    assert!(strict.check_symbol_name("m").is_err());
}

#[test]
fn custom_base_unit_gets_its_own_dimension() {
    let mut reg = UnitRegistry::new();
    assert_eq!(reg.define_custom_unit("EUR", "EUR", Some(3)).unwrap(), UnitKind::Base);
    let eur = reg.resolve("EUR").unwrap();
    assert!(!eur.is_dimensionless());
    let per_kwh = reg.resolve("EUR/kWh").unwrap();
    assert_ne!(per_kwh.dims(), eur.dims());
    assert_eq!(reg.custom_dimension_names(), ["EUR".to_string()]);

    let price = Quantity::new(12.0, eur);
    assert!(price.add(&Quantity::dimensionless(1.0)).is_err());
}

#[test]
fn custom_derived_and_compound_units() {
    let mut reg = UnitRegistry::new();
    assert_eq!(reg.define_custom_unit("mbar", "0.001 bar", None), Err(Error::DuplicateUnit {
        name: "mbar".into(),
        existing: "'mbar' (milli-prefixed 'bar')".into(),
    }));
    assert_eq!(reg.define_custom_unit("kp", "9.80665 N", Some(1)).unwrap(), UnitKind::Derived);
    assert_eq!(reg.define_custom_unit("Nm", "N*m", Some(2)).unwrap(), UnitKind::Compound);
    assert_eq!(reg.define_custom_unit("newton", "N", Some(4)).unwrap(), UnitKind::Alias);

    let kp = Quantity::new(1.0, reg.resolve("kp").unwrap());
    assert!(approx(reg.convert(&kp, "N").unwrap().magnitude, 9.80665));

    let names: Vec<_> = reg.custom_entries().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["kp", "Nm", "newton"]);
    assert!(reg.check_symbol_name("kp").is_err());
}

#[test]
fn to_base_renders_coherent_units() {
    let reg = UnitRegistry::new();
    let q = Quantity::new(3.0, reg.resolve("km").unwrap());
    let base = reg.to_base(&q);
    assert_eq!(base.magnitude, 3000.0);
    assert_eq!(base.unit_label(), "m");

    let pct = Quantity::new(50.0, reg.resolve("%").unwrap());
    let base = reg.to_base(&pct);
    assert!(base.unit.is_none());
    assert!(approx(base.magnitude, 0.5));
}

#[test]
fn huge_exponents_are_rejected_not_wrapped() {
    let reg = UnitRegistry::new();
    assert!(matches!(
        reg.resolve("m^2000000000*m^2000000000"),
        Err(Error::ExponentOverflow { .. })
    ));
    assert!(matches!(
        reg.resolve("(m^2000000000)^2"),
        Err(Error::ExponentOverflow { .. })
    ));

    let big = Quantity::new(1.0, reg.resolve("m^2000000000").unwrap());
    assert!(matches!(big.pow(2.0), Err(Error::ExponentOverflow { .. })));
    assert!(matches!(big.mul(&big), Err(Error::ExponentOverflow { .. })));
}
