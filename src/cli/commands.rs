//! Command dispatch
//!
//! Maps parsed arguments onto service calls and prints their results.

use tabled::Tabled;

use super::args::{Cli, Command, CreateCommand, DeleteCommand, LegacyArgs, LegacyCommand};
use super::extract::{extract_instance_name, extract_tenant_name};
use super::output::{OutputFormat, render, render_one, table};
use super::version::version_text;
use crate::chart::HelmCli;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::kube::readiness::Poll;
use crate::kube::{self, KubeCluster};
use crate::manifests::archive_for;
use crate::models::LoggingLevel;
use crate::repo::RepoManager;
use crate::services::{
    self, CheckInstallResult, InstallOptions, InstanceListing, InstanceRequest, LegacyOptions,
    TenantRequest,
};

async fn connect(settings: &Settings) -> Result<KubeCluster> {
    kube::connect(settings)
        .await
        .map_err(|e| Error::Unreachable(format!("{:#}", e)))
}

fn emit(text: &str) {
    if !text.is_empty() {
        println!("{}", text);
    }
}

/// One line of the `check-install` table
#[derive(Debug, Clone, Tabled)]
#[tabled(rename_all = "SCREAMING_SNAKE_CASE")]
struct CheckRow {
    component: String,
    status: String,
}

fn check_rows(result: &CheckInstallResult) -> Vec<CheckRow> {
    let present = |ok: bool, yes: &str, no: &str| if ok { yes } else { no }.to_string();
    let mut rows = vec![
        CheckRow {
            component: "istio".into(),
            status: present(result.mesh_installed, "installed", "missing"),
        },
        CheckRow {
            component: "namespace sitewhere-system".into(),
            status: present(result.system_namespace, "present", "missing"),
        },
    ];
    rows.extend(result.custom_resource_definitions.iter().map(|crd| CheckRow {
        component: format!("crd {}", crd.name),
        status: present(crd.established, "established", "not established"),
    }));
    rows.push(CheckRow {
        component: "release sitewhere".into(),
        status: match &result.release {
            Some(release) => format!(
                "{} ({}-{}, revision {})",
                release.status, release.chart, release.chart_version, release.revision
            ),
            None => "not installed".into(),
        },
    });
    rows
}

fn listing_text(format: OutputFormat, listing: &InstanceListing) -> Result<String> {
    if format != OutputFormat::Table {
        return render(format, listing, listing.instances.clone());
    }
    let mut text = table(listing.instances.clone());
    if !listing.microservices.is_empty() {
        text.push_str("\n\n");
        text.push_str(&table(listing.microservices.clone()));
    }
    Ok(text)
}

fn legacy_options(args: &LegacyArgs) -> LegacyOptions {
    LegacyOptions {
        minimal: args.minimal,
        skip_crd: args.skip_crd,
        skip_templates: args.skip_templates,
        skip_operator: args.skip_operator,
        skip_infra: args.skip_infra,
    }
}

/// Run one parsed command
pub async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let format = cli.output;
    match cli.command {
        Command::Version { short, template } => {
            emit(&version_text(short, template.as_deref())?);
        }
        Command::Install(args) => {
            let cluster = connect(&settings).await?;
            let repos = RepoManager::from_settings(&settings)?;
            let driver = HelmCli::from_settings(&settings);
            let options = InstallOptions {
                wait: args.wait,
                skip_crd: args.skip_crd,
                skip_templates: args.skip_templates,
                skip_operator: args.skip_operator,
                skip_infra: args.skip_infra,
                minimal: args.minimal,
                storage_class: args.storage_class,
                kafka_storage_size: args.kafka_storage_size,
                chart_version: args.chart_version,
                dependency_update: args.dependency_update,
            };
            let release = services::install(&cluster, &repos, &driver, &options).await?;
            emit(&render_one(format, &release)?);
        }
        Command::Uninstall { purge } => {
            let cluster = connect(&settings).await?;
            let driver = HelmCli::from_settings(&settings);
            let release = services::uninstall(&cluster, &driver, purge).await?;
            emit(&render_one(format, &release)?);
        }
        Command::CheckInstall => {
            let cluster = connect(&settings).await?;
            let archive = archive_for(settings.manifests.as_deref());
            let result = services::check_install(&cluster, &*archive).await?;
            emit(&render(format, &result, check_rows(&result))?);
        }
        Command::Create { resource } => {
            let cluster = connect(&settings).await?;
            match resource {
                CreateCommand::Instance(args) => {
                    let request = InstanceRequest {
                        name: extract_instance_name(&args.args)?,
                        namespace: args.namespace,
                        tag: args.tag,
                        registry: args.registry,
                        repository: args.repository,
                        replicas: args.replicas,
                        minimal: args.minimal,
                        debug: args.debug_profile,
                        configuration_template: args.configuration_template,
                        dataset_template: args.dataset_template,
                    };
                    let created =
                        services::create_instance(&cluster, &settings.home_dir(), request).await?;
                    emit(&render_one(format, &created)?);
                }
                CreateCommand::Tenant(args) => {
                    let request = TenantRequest {
                        name: extract_tenant_name(&args.args)?,
                        instance: args.instance,
                        authentication_token: args.token,
                        authorized_user_ids: args.users,
                        configuration_template: args.configuration_template,
                        dataset_template: args.dataset_template,
                    };
                    let outcome = services::create_tenant(&cluster, request).await?;
                    emit(&render_one(format, &outcome)?);
                }
            }
        }
        Command::Delete { resource } => {
            let cluster = connect(&settings).await?;
            match resource {
                DeleteCommand::Instance { args, purge } => {
                    let name = extract_instance_name(&args)?;
                    let deleted = services::delete_instance(&cluster, &name, purge).await?;
                    emit(&render_one(format, &deleted)?);
                }
                DeleteCommand::Tenant { args, instance } => {
                    let name = extract_tenant_name(&args)?;
                    let outcome = services::delete_tenant(&cluster, &instance, &name).await?;
                    emit(&render_one(format, &outcome)?);
                }
            }
        }
        Command::Instances { args } => {
            let name = extract_instance_name(&args)?;
            let cluster = connect(&settings).await?;
            let listing = services::list_instances(&cluster, Some(name.as_str())).await?;
            emit(&listing_text(format, &listing)?);
        }
        Command::Logs {
            instance,
            microservice,
            follow,
        } => {
            let cluster = connect(&settings).await?;
            let mut stdout = tokio::io::stdout();
            services::follow_logs(&cluster, &instance, &microservice, follow, &mut stdout).await?;
        }
        Command::LogLevel {
            instance,
            microservice,
            level,
            loggers,
        } => {
            let level: LoggingLevel = level.parse()?;
            let cluster = connect(&settings).await?;
            let changed =
                services::set_log_level(&cluster, &instance, &microservice, level, &loggers).await?;
            emit(&render(format, &changed, changed.overrides.clone())?);
        }
        Command::Legacy { command } => {
            let cluster = connect(&settings).await?;
            let archive = archive_for(settings.manifests.as_deref());
            let results = match command {
                LegacyCommand::Install(args) => {
                    services::legacy_install(
                        &cluster,
                        &*archive,
                        &legacy_options(&args),
                        Poll::default(),
                    )
                    .await?
                }
                LegacyCommand::Uninstall(args) => {
                    services::legacy_uninstall(&cluster, &*archive, &legacy_options(&args))
                        .await?
                }
            };
            emit(&render(format, &results, results.clone())?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::helm_release::ReleaseSummary;
    use crate::services::{CrdStatus, InstanceSummary};

    #[test]
    fn test_check_rows() {
        let result = CheckInstallResult {
            mesh_installed: true,
            system_namespace: false,
            custom_resource_definitions: vec![CrdStatus {
                name: "instances.sitewhere.io".into(),
                established: true,
            }],
            release: Some(ReleaseSummary {
                name: "sitewhere".into(),
                namespace: "sitewhere-system".into(),
                revision: 2,
                status: "deployed".into(),
                chart: "sitewhere-infrastructure".into(),
                chart_version: "0.1.10".into(),
                app_version: "3.0".into(),
            }),
        };
        let rows = check_rows(&result);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].status, "missing");
        assert_eq!(rows[2].status, "established");
        assert_eq!(rows[3].status, "deployed (sitewhere-infrastructure-0.1.10, revision 2)");
    }

    #[test]
    fn test_listing_table_includes_microservices_section() {
        let listing = InstanceListing {
            instances: vec![InstanceSummary {
                name: "sitewhere".into(),
                configuration_template: "default".into(),
                dataset_template: "default".into(),
                tag: "3.0".into(),
                microservices: 14,
                tenant_management: "Bootstrapped".into(),
                user_management: "Bootstrapped".into(),
            }],
            microservices: vec![],
        };
        let text = listing_text(OutputFormat::Table, &listing).unwrap();
        assert!(text.starts_with("NAME"));
        assert!(!text.contains("FUNCTIONAL_AREA"));

        let json = listing_text(OutputFormat::Json, &listing).unwrap();
        assert!(json.contains("\"instances\""));
    }
}
