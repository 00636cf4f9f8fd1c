use std::fmt::Debug;

/// Wraps a machine enumeration that may arrive with codes we have no name for. Unknown codes
/// are carried through as their raw value rather than rejected.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum MachineEnum<T>
where
    T: TryFrom<u8> + Copy,
    u8: From<T>,
{
    Value(T),
    Unknown(u8),
}

impl<T> MachineEnum<T>
where
    T: TryFrom<u8> + Copy,
    u8: From<T>,
{
    pub fn decode(value: u8) -> Self {
        if let Ok(value) = T::try_from(value) {
            MachineEnum::Value(value)
        } else {
            MachineEnum::Unknown(value)
        }
    }

    /// The known value, if this code had one.
    pub fn value(&self) -> Option<T> {
        match self {
            MachineEnum::Value(v) => Some(*v),
            MachineEnum::Unknown(_) => None,
        }
    }
}

impl<T> From<T> for MachineEnum<T>
where
    T: TryFrom<u8> + Copy,
    u8: From<T>,
{
    fn from(t: T) -> Self {
        MachineEnum::Value(t)
    }
}

impl<T> From<MachineEnum<T>> for u8
where
    T: TryFrom<u8> + Copy,
    u8: From<T>,
{
    fn from(e: MachineEnum<T>) -> u8 {
        match e {
            MachineEnum::Value(v) => v.into(),
            MachineEnum::Unknown(v) => v,
        }
    }
}

impl<T: Debug> Debug for MachineEnum<T>
where
    T: TryFrom<u8> + Copy,
    u8: From<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(t) => t.fmt(f),
            Self::Unknown(v) => write!(f, "Unknown({})", v),
        }
    }
}

impl<T: PartialEq> PartialEq<T> for MachineEnum<T>
where
    T: TryFrom<u8> + Copy,
    u8: From<T>,
{
    fn eq(&self, other: &T) -> bool {
        match self {
            Self::Value(t) => t.eq(other),
            Self::Unknown(_v) => false,
        }
    }
}
