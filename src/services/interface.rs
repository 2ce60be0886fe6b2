use crate::{downcast_svc, DynSvc, Service, Svc};
use std::any::Any;

/// Indicates that a type-erased service can be viewed as this type. Each
/// sized service type is an interface for itself. Trait objects (`dyn Trait`)
/// can't be recovered from a type-erased pointer without knowing the concrete
/// type, so their implementations must be declared explicitly with the
/// [`interface!`] macro.
pub trait Interface: Any {
    /// Attempts to view a type-erased service as this interface. If the
    /// service is not an implementation of this interface, the original
    /// pointer is returned.
    fn downcast(service: DynSvc) -> Result<Svc<Self>, DynSvc>;
}

impl<T: Service> Interface for T {
    fn downcast(service: DynSvc) -> Result<Svc<Self>, DynSvc> {
        downcast_svc(service)
    }
}

impl Interface for dyn Service {
    fn downcast(service: DynSvc) -> Result<Svc<Self>, DynSvc> {
        Ok(service)
    }
}

/// Marks a trait as being an interface for many other types. This means that
/// a service registered as any of the listed types can be requested (or
/// injected) as the given trait.
///
/// With the "arc" feature enabled, the trait must be a subtrait of [`Send`]
/// and [`Sync`]. If the "rc" feature is enabled, this is not required.
///
/// ## Example
///
/// ```
/// use field_injector::{interface, injectable, Container, Svc};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// #[derive(Default)]
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".to_owned()
///     }
/// }
/// injectable!(English {});
///
/// #[cfg(test)]
/// #[derive(Default)]
/// struct MockGreeter;
///
/// // Services registered as `English` (or, in a test run, `MockGreeter`)
/// // can be requested as `dyn Greeter`. Attributes are allowed on each of
/// // the listed types.
/// interface!(
///     Greeter = [
///         English,
///         #[cfg(test)]
///         MockGreeter,
///     ]
/// );
/// # #[cfg(test)]
/// # impl Greeter for MockGreeter {
/// #     fn greet(&self) -> String { String::new() }
/// # }
///
/// let mut container = Container::new();
/// container.add("greeter", English).unwrap();
/// container.compile().unwrap();
///
/// let greeter: Svc<dyn Greeter> = container.get("greeter").unwrap();
/// assert_eq!("hello", greeter.greet());
/// ```
#[macro_export]
macro_rules! interface {
    ($trait:tt = [$($(#[$attr:meta])* $impl:ty),* $(,)?]) => {
        impl $crate::Interface for dyn $trait {
            fn downcast(
                service: $crate::DynSvc,
            ) -> ::std::result::Result<$crate::Svc<Self>, $crate::DynSvc> {
                $(
                    $(#[$attr])*
                    let service = match <$impl as $crate::Interface>::downcast(service) {
                        ::std::result::Result::Ok(service) => {
                            return ::std::result::Result::Ok(
                                service as $crate::Svc<Self>,
                            );
                        }
                        ::std::result::Result::Err(service) => service,
                    };
                )*
                ::std::result::Result::Err(service)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{DynSvc, Interface, Svc};

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;
    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    struct Triangle;
    impl Shape for Triangle {
        fn sides(&self) -> u32 {
            3
        }
    }

    interface!(Shape = [Square, Triangle]);

    #[test]
    fn interface_resolves_every_listed_type() {
        let square: DynSvc = Svc::new(Square);
        let triangle: DynSvc = Svc::new(Triangle);

        let square = <dyn Shape as Interface>::downcast(square).ok().unwrap();
        let triangle = <dyn Shape as Interface>::downcast(triangle).ok().unwrap();

        assert_eq!(4, square.sides());
        assert_eq!(3, triangle.sides());
    }

    #[test]
    fn interface_rejects_unlisted_type() {
        let value: DynSvc = Svc::new(12_i32);
        assert!(<dyn Shape as Interface>::downcast(value).is_err());
    }

    #[test]
    fn sized_types_are_their_own_interface() {
        let value: DynSvc = Svc::new(12_i32);
        let value = <i32 as Interface>::downcast(value).ok().unwrap();
        assert_eq!(12, *value);
    }
}
