// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `sylva_bitflags!`, the flag-set type generator used by the usage and barrier masks.

/// Generates an integer-backed flag set.
///
/// The type gets its named constants, `EMPTY`, the usual set queries and
/// `|`, `&`, `|=`. `Debug` prints flag names joined by `|`.
#[macro_export]
#[doc(hidden)]
macro_rules! sylva_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            /// No flag set.
            pub const EMPTY: Self = Self { bits: 0 };

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// Wraps raw bits as-is, including undeclared ones.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Raw integer value.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// `true` when no bit is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// `true` when every bit of `other` is set.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// `true` when at least one bit of `other` is set.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Adds the bits of `other`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Drops the bits of `other`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut parts: std::vec::Vec<std::string::String> = std::vec::Vec::new();
                let mut unnamed = self.bits;
                $(
                    if $flag_value != 0 && self.contains(Self::$flag_name) {
                        parts.push(stringify!($flag_name).into());
                        unnamed &= !$flag_value;
                    }
                )*
                if unnamed != 0 {
                    parts.push(format!("{:#x}", unnamed));
                }
                if parts.is_empty() {
                    parts.push("EMPTY".into());
                }
                write!(f, "{}({})", stringify!($name), parts.join(" | "))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    sylva_bitflags! {
        /// Flags used only by these tests.
        pub struct Access: u32 {
            const READ = 1 << 0;
            const WRITE = 1 << 1;
            const INDIRECT = 1 << 4;
        }
    }

    #[test]
    fn combine_and_query() {
        let flags = Access::READ | Access::WRITE;
        assert!(flags.contains(Access::READ));
        assert!(flags.contains(Access::READ | Access::WRITE));
        assert!(!flags.contains(Access::INDIRECT));
        assert!(flags.intersects(Access::WRITE | Access::INDIRECT));
        assert_eq!(flags.bits(), 0b11);
    }

    #[test]
    fn insert_and_remove() {
        let mut flags = Access::EMPTY;
        assert!(flags.is_empty());
        flags.insert(Access::INDIRECT);
        flags |= Access::READ;
        assert_eq!(flags, Access::INDIRECT | Access::READ);
        flags.remove(Access::READ);
        assert_eq!(flags, Access::INDIRECT);
        assert_eq!((flags & Access::READ), Access::EMPTY);
    }

    #[test]
    fn debug_lists_flag_names() {
        assert_eq!(
            format!("{:?}", Access::READ | Access::INDIRECT),
            "Access(READ | INDIRECT)"
        );
        assert_eq!(format!("{:?}", Access::EMPTY), "Access(EMPTY)");
        assert_eq!(
            format!("{:?}", Access::from_bits_truncate(0b1000_0001)),
            "Access(READ | 0x80)"
        );
    }
}
