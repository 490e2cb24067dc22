use std::process::Command;

use anyhow::{Context, Result};

/// One `cargo check` invocation of the matrix
struct FeatureCheck {
    package: &'static str,
    default_features: bool,
    features: &'static [&'static str],
}

const FEATURE_COMBINATIONS: &[FeatureCheck] = &[
    FeatureCheck { package: "rebound-common", default_features: false, features: &["foundation"] },
    FeatureCheck {
        package: "rebound-common",
        default_features: false,
        features: &["observability"],
    },
    FeatureCheck { package: "rebound-common", default_features: true, features: &[] },
    FeatureCheck { package: "rebound-retry", default_features: true, features: &[] },
    FeatureCheck { package: "rebound-metrics", default_features: true, features: &[] },
    FeatureCheck { package: "rebound-metrics", default_features: true, features: &["prometheus"] },
];

impl FeatureCheck {
    fn label(&self) -> String {
        let mut label = String::from(self.package);
        if !self.default_features {
            label.push_str(" --no-default-features");
        }
        if !self.features.is_empty() {
            label.push_str(" --features ");
            label.push_str(&self.features.join(","));
        }
        label
    }
}

/// Check that all required feature combinations compile successfully.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, check) in FEATURE_COMBINATIONS.iter().enumerate() {
        let label = check.label();
        println!("\n[{}/{}] cargo check -p {label}", index + 1, FEATURE_COMBINATIONS.len());

        let mut command = Command::new("cargo");
        command.arg("check").arg("-p").arg(check.package);

        if !check.default_features {
            command.arg("--no-default-features");
        }
        if !check.features.is_empty() {
            command.arg("--features").arg(check.features.join(","));
        }

        let status = command
            .status()
            .with_context(|| format!("Failed to run cargo check for '{label}'"))?;

        if !status.success() {
            anyhow::bail!("Feature combination '{label}' failed to compile");
        }

        println!("✅ '{label}' compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());

    Ok(())
}
