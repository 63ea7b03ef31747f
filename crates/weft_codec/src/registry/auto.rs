//! Link-time collection of registrations, see [`auto_register!`](crate::auto_register).

use crate::registry::RegistryBuilder;

/// One registration function submitted by [`auto_register!`](crate::auto_register).
pub struct AutoRegistration {
    register: fn(&mut RegistryBuilder),
}

impl AutoRegistration {
    #[doc(hidden)]
    pub const fn new(register: fn(&mut RegistryBuilder)) -> Self {
        Self { register }
    }
}

#[cfg(feature = "auto_register")]
mod collect {
    use super::AutoRegistration;
    use crate::info::{GetDescriptor, ObjectDescriptor, TypeDescriptor};
    use crate::registry::RegistryBuilder;

    inventory::collect!(AutoRegistration);

    /// Registered by this crate; its presence after collection proves the
    /// platform runs link-time registration.
    pub(super) struct Available;

    crate::impl_typed!(Available, "weft_codec::registry::auto::Available");

    impl GetDescriptor for Available {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|_| Ok(Available)).into()
        }
    }

    fn register_available(builder: &mut RegistryBuilder) {
        builder.register::<Available>();
    }

    inventory::submit! {
        AutoRegistration::new(register_available)
    }

    pub(crate) fn register_all(builder: &mut RegistryBuilder) -> bool {
        if builder.contains::<Available>() {
            return true;
        }
        let mut count = 0_usize;
        for entry in inventory::iter::<AutoRegistration> {
            (entry.register)(builder);
            count += 1;
        }
        log::debug!("auto registration ran {count} entries");
        let available = builder.contains::<Available>();
        if !available {
            log::warn!("auto registration is not supported on this platform");
        }
        available
    }
}

#[cfg(feature = "auto_register")]
pub(crate) use collect::register_all;

/// Registers types with every [`RegistryBuilder::auto_register`] call.
///
/// Each type must implement [`GetDescriptor`](crate::info::GetDescriptor).
/// Without the `auto_register` feature the macro registers nothing.
///
/// ```
/// # use weft_codec::info::{GetDescriptor, ObjectDescriptor, TypeDescriptor};
/// struct Marker;
/// weft_codec::impl_typed!(Marker);
///
/// impl GetDescriptor for Marker {
///     fn get_descriptor() -> TypeDescriptor {
///         ObjectDescriptor::new(|_| Ok(Marker)).into()
///     }
/// }
///
/// weft_codec::auto_register!(Marker);
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! auto_register {
    ($($ty:ty),+ $(,)?) => {
        const _: () = {
            fn register(builder: &mut $crate::registry::RegistryBuilder) {
                $( builder.register::<$ty>(); )+
            }

            $crate::__macro_exports::inventory::submit! {
                $crate::registry::AutoRegistration::new(register)
            }
        };
    };
}

/// Registers types with every [`RegistryBuilder::auto_register`] call.
///
/// The `auto_register` feature is disabled, so this registers nothing.
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! auto_register {
    ($($ty:ty),+ $(,)?) => {
        const _: () = {
            #[allow(dead_code)]
            fn register(builder: &mut $crate::registry::RegistryBuilder) {
                $( builder.register::<$ty>(); )+
            }
        };
    };
}
