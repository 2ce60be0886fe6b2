#![allow(clippy::used_underscore_binding)]

use crate::DirectiveKind;
use derive_more::{Display, Error};
use downcast_rs::impl_downcast;
use std::any::{Any, TypeId};

#[cfg(feature = "rc")]
macro_rules! feature_unique {
    ({ $($common:tt)* }, { $($rc:tt)* }, { $($_arc:tt)* }) => {
        $($common)*
        $($rc)*
    };
}

#[cfg(feature = "arc")]
macro_rules! feature_unique {
    ({ $($common:tt)* }, { $($_rc:tt)* }, { $($arc:tt)* }) => {
        $($common)*
        $($arc)*
    };
}

feature_unique!(
    {
        /// A reference-counted pointer holding a wired service. The pointer
        /// type is determined by the feature flags passed to this crate.
        ///
        /// - **rc**: Pointer type is [`Rc<T>`](std::rc::Rc)
        /// - **arc**: Pointer type is [`Arc<T>`](std::sync::Arc) (default)
    },
    {
        pub type Svc<T> = std::rc::Rc<T>;
    },
    {
        pub type Svc<T> = std::sync::Arc<T>;
    }
);

/// A service pointer holding an instance of `dyn Service`.
pub type DynSvc = Svc<dyn Service>;

feature_unique!(
    {
        /// Implemented automatically on types that are capable of being a
        /// service.
    },
    {
        pub trait Service: downcast_rs::Downcast {}
        impl<T: ?Sized + downcast_rs::Downcast> Service for T {}
    },
    {
        pub trait Service: downcast_rs::DowncastSync {}
        impl<T: ?Sized + downcast_rs::DowncastSync> Service for T {}
    }
);

#[cfg(feature = "arc")]
impl_downcast!(sync Service);

#[cfg(feature = "rc")]
impl_downcast!(Service);

/// Attempts to recover the concrete pointer type of a type-erased service.
/// The original pointer is handed back on failure.
pub(crate) fn downcast_svc<T: Service>(
    service: DynSvc,
) -> Result<Svc<T>, DynSvc> {
    #[cfg(feature = "arc")]
    let service = service.downcast_arc::<T>();
    #[cfg(feature = "rc")]
    let service = service.downcast_rc::<T>();
    service
}

/// A result from attempting to register, wire or look up a service.
pub type InjectResult<T> = Result<T, InjectError>;

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// An error that has occurred while registering, compiling or querying a
/// container.
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum InjectError {
    /// A registration was attempted after the container started compiling.
    #[display(
        fmt = "cannot {} after the container has been compiled",
        operation
    )]
    Frozen {
        /// The rejected operation.
        operation: &'static str,
    },

    /// A lookup was attempted before the container was compiled.
    #[display(
        fmt = "the container must be compiled before services can be requested"
    )]
    NotCompiled,

    /// A previous compilation failed, leaving the container unusable.
    #[display(fmt = "the container failed to compile and can no longer be used")]
    CompilationFailed,

    /// A service directive referenced an id with no registered definition.
    #[display(
        fmt = "definition '{}' not found{}",
        id,
        "fmt_required_by(required_by.as_deref())"
    )]
    MissingDefinition {
        /// The id that was referenced.
        id: String,

        /// The id of the service whose directive referenced it.
        required_by: Option<String>,
    },

    /// A lookup requested an id that was never registered.
    #[display(fmt = "no service is registered as '{}'", id)]
    MissingService {
        /// The id that was requested.
        id: String,
    },

    /// A parameter directive referenced a parameter that was never set.
    #[display(
        fmt = "service parameter '{}' not found (required by {}::{})",
        name,
        "service_info.name()",
        field
    )]
    MissingParameter {
        /// The name of the missing parameter.
        name: String,

        /// The service declaring the directive.
        service_info: ServiceInfo,

        /// The field the parameter was meant for.
        field: &'static str,
    },

    /// A directive was declared with an empty target.
    #[display(
        fmt = "{} directive must not be empty for {}::{}",
        kind,
        "service_info.name()",
        field
    )]
    EmptyDirective {
        /// The service declaring the directive.
        service_info: ServiceInfo,

        /// The field the directive belongs to.
        field: &'static str,

        /// The kind of directive.
        kind: DirectiveKind,
    },

    /// A service transitively depends on itself.
    #[display(
        fmt = "circular reference to {} detected while building [{}]",
        "service_info.name()",
        "cycle.join(\" -> \")"
    )]
    CycleDetected {
        /// The service that was requested a second time.
        service_info: ServiceInfo,

        /// The ids of every service still being built when the cycle closed,
        /// outermost first, ending with the repeated id.
        cycle: Vec<String>,
    },

    /// A lookup requested a service as a type it can't be viewed as.
    #[display(
        fmt = "the service '{}' can't be provided as {}",
        id,
        "expected.name()"
    )]
    InvalidServiceType {
        /// The id that was requested.
        id: String,

        /// The requested type.
        expected: ServiceInfo,
    },

    /// A service directive targets a service of the wrong type for its field.
    #[display(
        fmt = "{}::{} can't hold the service '{}' (expected {})",
        "service_info.name()",
        field,
        id,
        "expected.name()"
    )]
    InvalidDependencyType {
        /// The service declaring the directive.
        service_info: ServiceInfo,

        /// The field being injected.
        field: &'static str,

        /// The id of the dependency.
        id: String,

        /// The type the field expects.
        expected: ServiceInfo,
    },

    /// A compiler pass reported a failure.
    #[display(fmt = "a compiler pass failed: {}", message)]
    PassFailed {
        /// A description of the failure.
        message: String,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(
        fmt = "an unexpected error occurred (please report this): {}",
        _0
    )]
    InternalError(#[error(ignore)] String),
}

impl InjectError {
    /// Creates an error for a compiler pass that could not complete.
    pub fn pass_failed(message: impl Into<String>) -> Self {
        InjectError::PassFailed {
            message: message.into(),
        }
    }
}

fn fmt_required_by(required_by: Option<&str>) -> String {
    match required_by {
        Some(id) => format!(" (required by '{}')", id),
        None => String::new(),
    }
}
