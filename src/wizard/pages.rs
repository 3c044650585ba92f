//! Wizard pages and the sections backing them.
//!
//! Field rendering lives with the host UI; each section here only knows how
//! to validate and collect its slice of the command.
use serde_json::{json, Value};

use crate::models::{Image, ServerGroupCommand, ServiceAccount};

/// Maximum length of a generated server group name
pub const MAX_SERVER_GROUP_NAME_LEN: usize = 63;
/// Room reserved for the `-vNNN` sequence suffix
const SEQUENCE_SUFFIX_LEN: usize = 5;
const CORE_FRACTIONS: [u32; 4] = [5, 20, 50, 100];

/// Reference data handed down to sections. Either list may be absent while loading.
///
/// A list can outlive the account it was fetched for (a reload in flight or a
/// failed reload keeps it), so the `*_owner` fields name the account a list was
/// successfully loaded for and are `None` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceData<'a> {
    pub service_accounts: Option<&'a [ServiceAccount]>,
    pub service_accounts_owner: Option<&'a str>,
    pub service_accounts_loading: bool,
    pub images: Option<&'a [Image]>,
    pub images_owner: Option<&'a str>,
    pub image_loading: bool,
}

impl<'a> ReferenceData<'a> {
    /// Service accounts loaded for `account`, if that is what is on hand
    pub fn service_accounts_for(&self, account: Option<&str>) -> Option<&'a [ServiceAccount]> {
        owned_by(self.service_accounts, self.service_accounts_owner, account)
    }

    /// Images loaded for `account`, if that is what is on hand
    pub fn images_for(&self, account: Option<&str>) -> Option<&'a [Image]> {
        owned_by(self.images, self.images_owner, account)
    }
}

fn owned_by<'a, T>(list: Option<&'a [T]>, owner: Option<&str>, account: Option<&str>) -> Option<&'a [T]> {
    match (owner, account) {
        (Some(owner), Some(account)) if owner == account.trim() => list,
        _ => None,
    }
}

/// Imperative handle a page exposes to the wizard
pub trait Section: Send + Sync {
    fn label(&self) -> &'static str;

    /// Return human-readable problems with this section's part of the command
    fn validate(&self, command: &ServerGroupCommand, refs: &ReferenceData<'_>) -> Vec<String>;

    /// This section's portion of the command
    fn collect(&self, command: &ServerGroupCommand) -> Value;
}

/// What a page receives besides the form binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageInputs {
    pub reference_data: bool,
    pub loading_flags: bool,
    pub account_changed: bool,
    pub image_source_selector: bool,
}

pub struct WizardPage {
    pub order: usize,
    pub section: Box<dyn Section>,
    pub inputs: PageInputs,
}

impl WizardPage {
    pub fn label(&self) -> &'static str {
        self.section.label()
    }
}

/// All pages in display order
pub fn pages(show_image_source_selector: bool) -> Vec<WizardPage> {
    let sections: Vec<(Box<dyn Section>, PageInputs)> = vec![
        (
            Box::new(BasicSettings),
            PageInputs {
                reference_data: true,
                loading_flags: true,
                account_changed: true,
                image_source_selector: false,
            },
        ),
        (Box::new(DeployPolicySettings), PageInputs::default()),
        (Box::new(InstanceTemplateSettings), PageInputs::default()),
        (Box::new(HealthChecks), PageInputs::default()),
        (Box::new(LoadBalancer), PageInputs::default()),
        (
            Box::new(AdvancedSettings),
            PageInputs {
                reference_data: true,
                loading_flags: true,
                account_changed: false,
                image_source_selector: show_image_source_selector,
            },
        ),
    ];
    sections
        .into_iter()
        .enumerate()
        .map(|(order, (section, inputs))| WizardPage { order, section, inputs })
        .collect()
}

fn is_name_part(value: &str, allow_hyphen: bool) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_hyphen && c == '-'))
}

pub struct BasicSettings;

impl Section for BasicSettings {
    fn label(&self) -> &'static str {
        "Basic Settings"
    }

    fn validate(&self, command: &ServerGroupCommand, _refs: &ReferenceData<'_>) -> Vec<String> {
        let mut errors = Vec::new();
        if command.account.as_deref().map_or(true, |a| a.trim().is_empty()) {
            errors.push("Account is required".to_string());
        }
        if let Some(stack) = &command.stack {
            if !is_name_part(stack, false) {
                errors.push("Stack may only contain letters, numbers and underscores".to_string());
            }
        }
        if let Some(detail) = &command.free_form_details {
            if !is_name_part(detail, true) {
                errors.push(
                    "Detail may only contain letters, numbers, underscores and dashes".to_string(),
                );
            }
        }
        if command.cluster_name().len() + SEQUENCE_SUFFIX_LEN > MAX_SERVER_GROUP_NAME_LEN {
            errors.push(format!(
                "Server group name must not exceed {} characters",
                MAX_SERVER_GROUP_NAME_LEN
            ));
        }
        errors
    }

    fn collect(&self, command: &ServerGroupCommand) -> Value {
        json!({
            "application": command.application,
            "credentials": command.account,
            "stack": command.stack,
            "freeFormDetails": command.free_form_details,
        })
    }
}

pub struct DeployPolicySettings;

impl Section for DeployPolicySettings {
    fn label(&self) -> &'static str {
        "Deploy policy"
    }

    fn validate(&self, command: &ServerGroupCommand, _refs: &ReferenceData<'_>) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(policy) = &command.deploy_policy {
            if policy.max_unavailable < 0 || policy.max_expansion < 0 {
                errors.push("Max unavailable and max expansion must not be negative".to_string());
            } else if policy.max_unavailable == 0 && policy.max_expansion == 0 {
                errors.push("Max unavailable and max expansion cannot both be zero".to_string());
            }
            if policy.max_deleting.map_or(false, |v| v < 0) || policy.max_creating.map_or(false, |v| v < 0) {
                errors.push("Max deleting and max creating must not be negative".to_string());
            }
        }
        errors
    }

    fn collect(&self, command: &ServerGroupCommand) -> Value {
        json!({ "deployPolicy": command.deploy_policy })
    }
}

pub struct InstanceTemplateSettings;

impl Section for InstanceTemplateSettings {
    fn label(&self) -> &'static str {
        "Instance template"
    }

    fn validate(&self, command: &ServerGroupCommand, _refs: &ReferenceData<'_>) -> Vec<String> {
        let mut errors = Vec::new();
        let Some(template) = &command.instance_template else {
            return errors;
        };
        if let Some(resources) = &template.resources_spec {
            if resources.cores < 1 {
                errors.push("At least one core is required".to_string());
            }
            if resources.memory <= 0.0 {
                errors.push("Memory must be positive".to_string());
            }
            if let Some(fraction) = resources.core_fraction {
                if !CORE_FRACTIONS.contains(&fraction) {
                    errors.push(format!("Core fraction must be one of {:?}", CORE_FRACTIONS));
                }
            }
        }
        if let Some(disk) = &template.boot_disk_spec {
            if disk.size.map_or(false, |s| s <= 0.0) {
                errors.push("Boot disk size must be positive".to_string());
            }
        }
        errors
    }

    fn collect(&self, command: &ServerGroupCommand) -> Value {
        json!({ "instanceTemplate": command.instance_template })
    }
}

pub struct HealthChecks;

impl Section for HealthChecks {
    fn label(&self) -> &'static str {
        "Autohealing policy"
    }

    fn validate(&self, command: &ServerGroupCommand, _refs: &ReferenceData<'_>) -> Vec<String> {
        let mut errors = Vec::new();
        for (i, spec) in command.health_check_specs.iter().enumerate() {
            let n = i + 1;
            match spec.kind.as_deref() {
                Some("HTTP") => {
                    if spec.path.as_deref().map_or(true, str::is_empty) {
                        errors.push(format!("Health check #{}: HTTP checks need a path", n));
                    }
                }
                Some("TCP") | None => {}
                Some(other) => errors.push(format!("Health check #{}: unknown type {}", n, other)),
            }
            if let Some(port) = spec.port {
                if !(1..=65535).contains(&port) {
                    errors.push(format!("Health check #{}: port must be between 1 and 65535", n));
                }
            }
            if let (Some(interval), Some(timeout)) = (spec.interval, spec.timeout) {
                if timeout >= interval {
                    errors.push(format!("Health check #{}: timeout must be shorter than interval", n));
                }
            }
        }
        errors
    }

    fn collect(&self, command: &ServerGroupCommand) -> Value {
        json!({ "healthCheckSpecs": command.health_check_specs })
    }
}

pub struct LoadBalancer;

fn is_resource_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return false;
    };
    name.len() <= 63
        && first.is_ascii_lowercase()
        && rest.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && !name.ends_with('-')
}

impl Section for LoadBalancer {
    fn label(&self) -> &'static str {
        "Load Balancer"
    }

    fn validate(&self, command: &ServerGroupCommand, _refs: &ReferenceData<'_>) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(name) = command.target_group_spec.as_ref().and_then(|t| t.name.as_deref()) {
            if !is_resource_name(name) {
                errors.push(
                    "Target group name must start with a lowercase letter and contain only lowercase letters, digits and dashes"
                        .to_string(),
                );
            }
        }
        errors
    }

    fn collect(&self, command: &ServerGroupCommand) -> Value {
        json!({ "targetGroupSpec": command.target_group_spec })
    }
}

pub struct AdvancedSettings;

impl Section for AdvancedSettings {
    fn label(&self) -> &'static str {
        "Advanced settings"
    }

    fn validate(&self, command: &ServerGroupCommand, refs: &ReferenceData<'_>) -> Vec<String> {
        let mut errors = Vec::new();
        let Some(template) = &command.instance_template else {
            return errors;
        };
        // Only checked against lists loaded for the selected account
        let account = command.account.as_deref();
        if let (Some(id), Some(accounts)) = (&template.service_account_id, refs.service_accounts_for(account)) {
            if !accounts.iter().any(|a| &a.id == id) {
                errors.push(format!("Unknown service account {}", id));
            }
        }
        let image_id = template.boot_disk_spec.as_ref().and_then(|d| d.image_id.as_ref());
        if let (Some(id), Some(images)) = (image_id, refs.images_for(account)) {
            if !images.iter().any(|i| &i.id == id) {
                errors.push(format!("Unknown image {}", id));
            }
        }
        errors
    }

    fn collect(&self, command: &ServerGroupCommand) -> Value {
        let template = command.instance_template.as_ref();
        json!({
            "serviceAccountId": template.and_then(|t| t.service_account_id.clone()),
            "imageId": template
                .and_then(|t| t.boot_disk_spec.as_ref())
                .and_then(|d| d.image_id.clone()),
        })
    }
}
