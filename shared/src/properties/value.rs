use kgame_serde::Serde;

/// A type that can be stored in a replicated property.
///
/// `debug_value` gives the text shown by `PropertyHandler::property_value`;
/// types without a readable form keep the default and show as "Unknown".
pub trait PropertyValue: Serde + Send + Sync + 'static {
    fn debug_value(&self) -> Option<String> {
        None
    }
}

macro_rules! impl_property_value_for_number {
    ($($ty:ty),*) => {$(
        impl PropertyValue for $ty {
            fn debug_value(&self) -> Option<String> {
                Some(self.to_string())
            }
        }
    )*};
}

impl_property_value_for_number!(u8, u16, u32, u64, i8, i16, i32, i64);

impl PropertyValue for bool {
    fn debug_value(&self) -> Option<String> {
        Some(if *self { "True" } else { "False" }.to_string())
    }
}

impl PropertyValue for String {
    fn debug_value(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn debug_value(&self) -> Option<String> {
        match self {
            Some(value) => value.debug_value(),
            None => Some("None".to_string()),
        }
    }
}

impl<T: PropertyValue> PropertyValue for Vec<T> {
    fn debug_value(&self) -> Option<String> {
        let items = self
            .iter()
            .map(PropertyValue::debug_value)
            .collect::<Option<Vec<_>>>()?;
        Some(format!("[{}]", items.join(", ")))
    }
}

impl<A: PropertyValue, B: PropertyValue> PropertyValue for (A, B) {
    fn debug_value(&self) -> Option<String> {
        Some(format!("({}, {})", self.0.debug_value()?, self.1.debug_value()?))
    }
}
