//! Building and publishing every image a deploy needs.
//!
//! Jobs run on a pool of scoped worker threads bounded by the concurrency
//! limit. The image map is assembled from completed jobs only; the first
//! failure cancels the remaining jobs and discards the map.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::mpsc;

use stratus_common::app::ServiceOrigin;
use stratus_common::constants::PROD_DOCKERFILE;
use stratus_common::context::AppContext;
use stratus_common::error::{Result, StratusError};

use crate::account::CloudAccount;
use crate::cancel::CancelToken;
use crate::context::{ImageMap, RemoteAccount};
use crate::infra::remote_dependencies;
use crate::runtime::ContainerRuntime;

/// Where the local copy of an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Built from source and tagged `local_tag`.
    Build {
        /// Build context.
        context: PathBuf,
        /// Dockerfile, relative to the context.
        dockerfile: String,
        /// Tag given to the local build.
        local_tag: String,
    },
    /// Pulled from a registry.
    Pull {
        /// Image reference.
        image: String,
    },
}

/// One image to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    /// Service role or dependency name; the key in the image map.
    pub name: String,
    /// Tag of the published image.
    pub version: String,
    /// Local source of the image.
    pub source: ImageSource,
}

impl ImageJob {
    /// Repository name inside the registry.
    pub fn repository(&self, app_name: &str) -> String {
        format!("{app_name}-{}", self.name)
    }

    /// Fully qualified published reference.
    pub fn target(&self, registry: &str, app_name: &str) -> String {
        format!("{registry}/{}:{}", self.repository(app_name), self.version)
    }

    fn local_reference(&self) -> &str {
        match &self.source {
            ImageSource::Build { local_tag, .. } => local_tag,
            ImageSource::Pull { image } => image,
        }
    }
}

/// Lists the images of every service and every containerised dependency.
///
/// # Errors
///
/// Returns a validation error for a service without a single origin.
pub fn image_jobs(app: &AppContext) -> Result<Vec<ImageJob>> {
    let mut jobs = Vec::new();
    for (role, source) in &app.definition.services {
        let job = match source.origin(role)? {
            ServiceOrigin::Location(_) => ImageJob {
                name: role.clone(),
                version: app.definition.version.clone(),
                source: ImageSource::Build {
                    context: source.build_context(&app.dir).unwrap_or_else(|| app.dir.clone()),
                    dockerfile: PROD_DOCKERFILE.to_string(),
                    local_tag: format!("{}-{role}", app.name()),
                },
            },
            ServiceOrigin::DockerImage(image) => ImageJob {
                name: role.clone(),
                version: image
                    .rsplit_once(':')
                    .map_or("latest", |(_, tag)| tag)
                    .to_string(),
                source: ImageSource::Pull {
                    image: image.to_string(),
                },
            },
        };
        jobs.push(job);
    }
    for dep in remote_dependencies(app) {
        let Some(spec) = dep.container_spec()? else {
            continue;
        };
        let Some(image) = spec.image else {
            continue;
        };
        jobs.push(ImageJob {
            name: dep.name().to_string(),
            version: dep.descriptor().version.clone(),
            source: ImageSource::Pull { image },
        });
    }
    Ok(jobs)
}

/// Shared inputs of every publish job.
#[derive(Clone, Copy)]
pub struct PublishTarget<'a> {
    /// Account holding the registry.
    pub account: &'a RemoteAccount,
    /// Registry host.
    pub registry: &'a str,
    /// Runtime doing the build, tag and push.
    pub runtime: &'a dyn ContainerRuntime,
    /// Account used to create repositories.
    pub cloud: &'a dyn CloudAccount,
}

/// Publishes every job with at most `concurrency` jobs in flight.
///
/// # Errors
///
/// Returns the first job failure, or [`StratusError::Cancelled`] if
/// `cancel` fires first.
pub fn publish_images(
    jobs: Vec<ImageJob>,
    target: PublishTarget<'_>,
    concurrency: usize,
    cancel: &CancelToken,
) -> Result<ImageMap> {
    let workers = concurrency.clamp(1, jobs.len().max(1));
    let total = jobs.len();
    let queue = Mutex::new(VecDeque::from(jobs));
    let abort = cancel.child();
    let (tx, rx) = mpsc::channel::<Result<(String, String)>>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (queue, abort) = (&queue, &abort);
            let _ = scope.spawn(move || {
                loop {
                    if abort.is_cancelled() {
                        break;
                    }
                    let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                    let Some(job) = next else {
                        break;
                    };
                    let result = publish_one(&job, target, abort).map(|reference| (job.name, reference));
                    if result.is_err() {
                        abort.cancel();
                    }
                    if tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut images = ImageMap::new();
    let mut first_error = None;
    for result in rx {
        match result {
            Ok((name, reference)) => {
                let _ = images.insert(name, reference);
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    if cancel.is_cancelled() || images.len() != total {
        return Err(StratusError::Cancelled);
    }
    Ok(images)
}

fn publish_one(job: &ImageJob, target: PublishTarget<'_>, cancel: &CancelToken) -> Result<String> {
    let app_name = &target.account.app_name;
    tracing::info!(image = %job.name, version = %job.version, "publishing image");
    match &job.source {
        ImageSource::Build {
            context,
            dockerfile,
            local_tag,
        } => target.runtime.build(context, dockerfile, local_tag, cancel)?,
        ImageSource::Pull { image } => target.runtime.pull(image, cancel)?,
    }
    target.cloud.ensure_repository(target.account, &job.repository(app_name))?;
    let reference = job.target(target.registry, app_name);
    target.runtime.tag(job.local_reference(), &reference)?;
    target.runtime.push(&reference, cancel)?;
    tracing::info!(image = %job.name, reference = %reference, "image published");
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use stratus_common::app::{ApplicationDefinition, ServiceSource};
    use stratus_common::dependency::{DependencyDescriptor, RdsConfig};
    use stratus_common::service::ServiceConfig;

    use super::*;

    fn app() -> AppContext {
        let mut definition = ApplicationDefinition {
            name: "todo-app".into(),
            version: "1.2.0".into(),
            ..ApplicationDefinition::default()
        };
        let _ = definition.services.insert(
            "web".into(),
            ServiceSource {
                location: Some("./web".into()),
                ..ServiceSource::default()
            },
        );
        let _ = definition.services.insert(
            "proxy".into(),
            ServiceSource {
                docker_image: Some("nginx:1.13".into()),
                ..ServiceSource::default()
            },
        );
        definition.remote.dependencies.push(DependencyDescriptor::new("exocom", "0.26.1"));
        let mut db = DependencyDescriptor::new("postgres", "9.6");
        db.config.rds = Some(RdsConfig::default());
        definition.remote.dependencies.push(db);
        let services = BTreeMap::from([
            ("web".to_string(), ServiceConfig::default()),
            ("proxy".to_string(), ServiceConfig::default()),
        ]);
        AppContext::from_parts("/apps/todo", definition, services)
    }

    #[test]
    fn jobs_cover_services_and_containerised_dependencies() {
        let jobs = image_jobs(&app()).expect("jobs");
        let names: Vec<&str> = jobs.iter().map(|job| job.name.as_str()).collect();
        assert_eq!(names, vec!["proxy", "web", "exocom"]);

        assert_eq!(
            jobs[0].source,
            ImageSource::Pull {
                image: "nginx:1.13".into()
            }
        );
        assert_eq!(jobs[0].version, "1.13");
        assert_eq!(
            jobs[1].source,
            ImageSource::Build {
                context: PathBuf::from("/apps/todo/web"),
                dockerfile: "Dockerfile.prod".into(),
                local_tag: "todo-app-web".into(),
            }
        );
        assert_eq!(jobs[1].version, "1.2.0");
        assert_eq!(
            jobs[2].target("reg.example.com", "todo-app"),
            "reg.example.com/todo-app-exocom:0.26.1"
        );
    }
}
