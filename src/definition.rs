use crate::{Dependency, Injectable, ServiceInfo, Unwired, UnwiredService};
use std::fmt::{Debug, Formatter};

/// The registration record of a service: its id, its backing instance and
/// its tags.
///
/// A definition owns its service until the container compiles. Compilation
/// consumes the instance exactly once; afterwards the definition only
/// describes what was registered.
pub struct Definition {
    id: String,
    service_info: ServiceInfo,
    dependencies: Vec<Dependency>,
    tags: Vec<String>,
    service: Option<Box<dyn Unwired>>,
}

impl Definition {
    /// Creates a definition for `service`, registered as `id`.
    pub fn new<T: Injectable>(id: impl Into<String>, service: T) -> Self {
        let service = UnwiredService::new(service);
        Definition {
            id: id.into(),
            service_info: ServiceInfo::of::<T>(),
            dependencies: service.dependencies(),
            tags: Vec::new(),
            service: Some(Box::new(service)),
        }
    }

    /// Attaches a tag to this definition. Tags group services so they can be
    /// requested together with
    /// [`Container::get_tagged`](crate::Container::get_tagged).
    ///
    /// ## Example
    ///
    /// ```
    /// use field_injector::{injectable, Container, Service};
    ///
    /// struct HomeController;
    /// struct AdminController;
    /// injectable!(HomeController {});
    /// injectable!(AdminController {});
    ///
    /// let mut container = Container::new();
    /// container.add("home", HomeController).unwrap().tag("controllers");
    /// container
    ///     .add("admin", AdminController)
    ///     .unwrap()
    ///     .tag("controllers")
    ///     .tag("restricted");
    /// container.compile().unwrap();
    ///
    /// let controllers = container.get_tagged::<dyn Service>("controllers").unwrap();
    /// assert_eq!(2, controllers.map_or(0, |services| services.len()));
    /// ```
    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.push(tag.into());
        self
    }

    /// Gets the id this service is registered as.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the tags attached to this service, in the order they were added.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Gets the concrete type of this service.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// Gets the dependencies this service declares, in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Returns whether the service instance has been consumed by
    /// compilation.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.service.is_none()
    }

    pub(crate) fn take_service(&mut self) -> Option<Box<dyn Unwired>> {
        self.service.take()
    }
}

impl Debug for Definition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("id", &self.id)
            .field("service", &self.service_info.name())
            .field("dependencies", &self.dependencies)
            .field("tags", &self.tags)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
