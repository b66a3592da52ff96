//! Builds a profile data object and prints it as JSON.
//!
//! Usage: build_profile [TEMPLATE] [SITE] [LEVELS]

use nctemplate::{encode_data_object, DataObjectBuilder, TemplateRegistry};

const PROFILE: &str = r#"
data_object_type: profile
global_attributes:
  - title: {data_type: str, value: "{site} profile"}
  - Conventions: {data_type: str, value: "CF-1.6"}
variables:
  - level:
      - data_type: int32
      - dimensions: [level]
      - units: {data_type: str, value: "1"}
      - long_name: {data_type: str, value: model level}
  - temperature:
      - data_type: float32
      - dimensions: [level]
      - units: {data_type: str, value: K}
      - standard_name: {data_type: str, value: air_temperature}
      - missing_value: {data_type: float32, value: "$missing"}
"#;

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next();
    let site = args.next().unwrap_or_else(|| "Alpha".to_string());
    let levels: usize = args
        .next()
        .map(|n| n.parse().expect("LEVELS must be a positive integer"))
        .unwrap_or(5);

    let mut registry = TemplateRegistry::new();
    let key = match &path {
        Some(path) => registry.load_file(path),
        None => registry.load_str("profile.yaml", PROFILE),
    }
    .unwrap_or_else(|e| panic!("Failed to load template: {}", e));

    let template = registry.lookup(&key).expect("registered template");
    println!("=== Template '{}' ===", key);
    println!("{}", template.requirements());

    let mut builder = DataObjectBuilder::new(template)
        .add_fill_value(true)
        .dimension("level", levels)
        .substitution("site", site);
    for requirement in template.substitution_requirements() {
        if requirement.key != "site" {
            builder = builder.substitution(requirement.key.clone(), -999.0);
        }
    }

    let object = builder
        .build()
        .unwrap_or_else(|e| panic!("Failed to build data object: {}", e));

    println!("\n=== Data object ===");
    println!(
        "{}",
        encode_data_object(&object).expect("Failed to encode data object")
    );
}
