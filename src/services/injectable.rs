use crate::{
    DynSvc, InjectError, InjectResult, Interface, Service, ServiceInfo, Svc,
};
use derive_more::Display;

/// The kind of value a directive asks the container to inject.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display)]
pub enum DirectiveKind {
    /// Inject another service, by id.
    #[display(fmt = "service")]
    Service,

    /// Inject a parameter, by name.
    #[display(fmt = "parameter")]
    Parameter,
}

/// A declared dependency of a service: which field is injected, with what
/// kind of value, and from which id or parameter name.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Dependency {
    field: &'static str,
    kind: DirectiveKind,
    target: String,
}

impl Dependency {
    /// The name of the field that receives the dependency.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Whether this is a service or a parameter dependency.
    #[must_use]
    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    /// The service id or parameter name that is injected.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A resolved value, ready to be handed to a directive's setter.
pub(crate) enum Injected {
    Service(DynSvc),
    Parameter(String),
}

type Setter<T> = Box<dyn FnOnce(&mut T, Injected) -> InjectResult<()>>;

struct Directive<T> {
    dependency: Dependency,
    inject: Setter<T>,
}

/// The dependency directives declared by a service type. See [`Injectable`].
pub struct Directives<T> {
    directives: Vec<Directive<T>>,
}

impl<T: Injectable> Directives<T> {
    pub(crate) fn of() -> Self {
        let mut directives = Directives {
            directives: Vec::new(),
        };
        T::declare(&mut directives);
        directives
    }

    /// Declares that `field` receives the service registered as `id`. The
    /// dependency can be requested as its concrete type or as any
    /// [`Interface`] it implements.
    pub fn service<D, F>(
        &mut self,
        field: &'static str,
        id: impl Into<String>,
        inject: F,
    ) -> &mut Self
    where
        D: ?Sized + Interface,
        F: 'static + FnOnce(&mut T, Svc<D>),
    {
        let id = id.into();
        let dependency_id = id.clone();
        self.push(field, DirectiveKind::Service, id, move |service, value| {
            let dependency = match value {
                Injected::Service(dependency) => dependency,
                Injected::Parameter(_) => {
                    return Err(InjectError::InternalError(format!(
                        "a parameter was resolved for the service directive on {}::{}",
                        ServiceInfo::of::<T>().name(),
                        field
                    )))
                }
            };
            let dependency = D::downcast(dependency).map_err(|_| {
                InjectError::InvalidDependencyType {
                    service_info: ServiceInfo::of::<T>(),
                    field,
                    id: dependency_id,
                    expected: ServiceInfo::of::<D>(),
                }
            })?;
            inject(service, dependency);
            Ok(())
        })
    }

    /// Declares that `field` receives the value of the parameter `name`.
    pub fn parameter<F>(
        &mut self,
        field: &'static str,
        name: impl Into<String>,
        inject: F,
    ) -> &mut Self
    where
        F: 'static + FnOnce(&mut T, String),
    {
        self.push(
            field,
            DirectiveKind::Parameter,
            name.into(),
            move |service, value| match value {
                Injected::Parameter(value) => {
                    inject(service, value);
                    Ok(())
                }
                Injected::Service(_) => Err(InjectError::InternalError(
                    format!(
                        "a service was resolved for the parameter directive on {}::{}",
                        ServiceInfo::of::<T>().name(),
                        field
                    ),
                )),
            },
        )
    }

    /// Iterates over the declared dependencies in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.directives.iter().map(|directive| &directive.dependency)
    }

    fn push<F>(
        &mut self,
        field: &'static str,
        kind: DirectiveKind,
        target: String,
        inject: F,
    ) -> &mut Self
    where
        F: 'static + FnOnce(&mut T, Injected) -> InjectResult<()>,
    {
        self.directives.push(Directive {
            dependency: Dependency {
                field,
                kind,
                target,
            },
            inject: Box::new(inject),
        });
        self
    }
}

/// A service type whose fields are wired by a
/// [`Container`](crate::Container).
///
/// Implementors declare one directive per injected field. The container reads
/// these during compilation, resolves each target, and hands the resolved
/// value to the directive's setter. Most implementations should be generated
/// by the [`injectable!`] macro.
///
/// ## Example
///
/// ```
/// use field_injector::{Container, Directives, Injectable, Svc};
///
/// #[derive(Default)]
/// struct Database {
///     url: String,
/// }
///
/// impl Injectable for Database {
///     fn declare(directives: &mut Directives<Self>) {
///         directives.parameter("url", "database_url", |db, url| db.url = url);
///     }
/// }
///
/// #[derive(Default)]
/// struct Repository {
///     database: Option<Svc<Database>>,
/// }
///
/// impl Injectable for Repository {
///     fn declare(directives: &mut Directives<Self>) {
///         directives.service("database", "app.database", |repo, db| {
///             repo.database = Some(db)
///         });
///     }
/// }
///
/// let mut container = Container::new();
/// container.add_parameter("database_url", "postgres://localhost").unwrap();
/// container.add("app.repository", Repository::default()).unwrap();
/// container.add("app.database", Database::default()).unwrap();
/// container.compile().unwrap();
///
/// let repository: Svc<Repository> = container.get("app.repository").unwrap();
/// let database: Svc<Database> = container.get("app.database").unwrap();
/// assert!(Svc::ptr_eq(repository.database.as_ref().unwrap(), &database));
/// assert_eq!("postgres://localhost", database.url);
/// ```
pub trait Injectable: Service + Sized {
    /// Declares the dependency directives of this type.
    fn declare(directives: &mut Directives<Self>);
}

/// A registered service that has not been wired yet.
pub(crate) trait Unwired: 'static {
    /// Resolves every directive through `resolve`, injects the results and
    /// hands back the finished service.
    fn wire(
        self: Box<Self>,
        resolve: &mut dyn FnMut(&Dependency) -> InjectResult<Injected>,
    ) -> InjectResult<DynSvc>;
}

pub(crate) struct UnwiredService<T> {
    service: T,
    directives: Directives<T>,
}

impl<T: Injectable> UnwiredService<T> {
    pub fn new(service: T) -> Self {
        UnwiredService {
            service,
            directives: Directives::of(),
        }
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.directives.dependencies().cloned().collect()
    }
}

impl<T: Injectable> Unwired for UnwiredService<T> {
    fn wire(
        self: Box<Self>,
        resolve: &mut dyn FnMut(&Dependency) -> InjectResult<Injected>,
    ) -> InjectResult<DynSvc> {
        let UnwiredService {
            mut service,
            directives,
        } = *self;

        for directive in directives.directives {
            let value = resolve(&directive.dependency)?;
            (directive.inject)(&mut service, value)?;
        }

        let service: DynSvc = Svc::new(service);
        Ok(service)
    }
}

/// Implements [`Injectable`] for a struct from a list of field directives.
///
/// - `field: service("id")` injects the service registered as `"id"`. The
///   field must be an `Option<Svc<T>>`, where `T` is either the service's
///   concrete type or an [`Interface`] it implements.
/// - `field: parameter("name")` injects the parameter `"name"`. The field can
///   be any type implementing `From<String>`.
///
/// ## Example
///
/// ```
/// use field_injector::{injectable, Container, Svc};
///
/// #[derive(Default)]
/// struct Credentials {
///     username: String,
///     password: Option<String>,
/// }
///
/// #[derive(Default)]
/// struct Client {
///     credentials: Option<Svc<Credentials>>,
/// }
///
/// injectable! {
///     Credentials {
///         username: parameter("username"),
///         password: parameter("password"),
///     }
/// }
///
/// injectable! {
///     Client {
///         credentials: service("app.credentials"),
///     }
/// }
///
/// let mut container = Container::new();
/// container.add_parameter("username", "john").unwrap();
/// container.add_parameter("password", "123").unwrap();
/// container.add("app.client", Client::default()).unwrap();
/// container.add("app.credentials", Credentials::default()).unwrap();
/// container.compile().unwrap();
///
/// let client: Svc<Client> = container.get("app.client").unwrap();
/// let credentials = client.credentials.as_ref().unwrap();
/// assert_eq!("john", credentials.username);
/// assert_eq!(Some("123"), credentials.password.as_deref());
/// ```
#[macro_export]
macro_rules! injectable {
    (@directive $directives:ident, $field:ident, service, $target:expr) => {
        $directives.service(
            ::std::stringify!($field),
            $target,
            |service: &mut Self, dependency| {
                service.$field = ::std::option::Option::Some(dependency);
            },
        );
    };
    (@directive $directives:ident, $field:ident, parameter, $target:expr) => {
        $directives.parameter(
            ::std::stringify!($field),
            $target,
            |service: &mut Self, value| {
                service.$field = ::std::convert::Into::into(value);
            },
        );
    };
    (
        $service:ty {
            $($field:ident : $kind:ident ( $target:expr )),*
            $(,)?
        }
    ) => {
        impl $crate::Injectable for $service {
            #[allow(unused_variables)]
            fn declare(directives: &mut $crate::Directives<Self>) {
                $(
                    $crate::injectable!(@directive directives, $field, $kind, $target);
                )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Mailer {
        host: String,
        logger: Option<Svc<Logger>>,
    }

    #[derive(Default)]
    struct Logger;

    injectable!(Logger {});

    injectable! {
        Mailer {
            host: parameter("mailer.host"),
            logger: service("app.logger"),
        }
    }

    #[test]
    fn directives_are_listed_in_declaration_order() {
        let directives = Directives::<Mailer>::of();
        let dependencies: Vec<_> = directives.dependencies().collect();

        assert_eq!(2, dependencies.len());
        assert_eq!("host", dependencies[0].field());
        assert_eq!(DirectiveKind::Parameter, dependencies[0].kind());
        assert_eq!("mailer.host", dependencies[0].target());
        assert_eq!("logger", dependencies[1].field());
        assert_eq!(DirectiveKind::Service, dependencies[1].kind());
        assert_eq!("app.logger", dependencies[1].target());
    }

    #[test]
    fn wire_injects_resolved_values() {
        let logger: DynSvc = Svc::new(Logger);
        let expected = logger.clone();
        let unwired: Box<dyn Unwired> =
            Box::new(UnwiredService::new(Mailer::default()));

        let wired = unwired
            .wire(&mut |dependency| match dependency.kind() {
                DirectiveKind::Service => Ok(Injected::Service(logger.clone())),
                DirectiveKind::Parameter => {
                    Ok(Injected::Parameter("smtp.local".to_owned()))
                }
            })
            .unwrap();

        let mailer = <Mailer as Interface>::downcast(wired).ok().unwrap();
        assert_eq!("smtp.local", mailer.host);
        let expected = <Logger as Interface>::downcast(expected).ok().unwrap();
        assert!(Svc::ptr_eq(mailer.logger.as_ref().unwrap(), &expected));
    }

    #[test]
    fn wire_rejects_mismatched_dependency() {
        let unwired: Box<dyn Unwired> =
            Box::new(UnwiredService::new(Mailer::default()));

        let result = unwired.wire(&mut |dependency| match dependency.kind() {
            DirectiveKind::Service => Ok(Injected::Service(Svc::new(1_u8))),
            DirectiveKind::Parameter => Ok(Injected::Parameter(String::new())),
        });

        match result {
            Err(InjectError::InvalidDependencyType { field, id, .. }) => {
                assert_eq!("logger", field);
                assert_eq!("app.logger", id);
            }
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("a u8 was injected as a logger"),
        }
    }
}
