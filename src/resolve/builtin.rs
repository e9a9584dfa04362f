/// Name the embedded standard library is registered under.
pub const STD_CRATE: &str = "std";

pub const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64",
    "u128", "usize", "f32", "f64",
];

pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

/// Declarations of the standard items paths commonly lean on. Bodies are omitted.
pub const STD_SOURCE: &str = r#"
pub mod marker {
    pub trait Sized {}
    pub trait Send {}
    pub trait Sync {}
    pub trait Unpin {}
    pub trait Copy: Clone {}
    pub struct PhantomData<T: ?Sized>;
}

pub mod clone {
    pub trait Clone: Sized {
        fn clone(&self) -> Self;
    }
}

pub mod default {
    pub trait Default: Sized {
        fn default() -> Self;
    }
}

pub mod cmp {
    pub trait PartialEq<Rhs: ?Sized = Self> {
        fn eq(&self, other: &Rhs) -> bool;
    }
    pub trait Eq: PartialEq<Self> {}
    pub trait PartialOrd<Rhs: ?Sized = Self>: PartialEq<Rhs> {}
    pub trait Ord: Eq + PartialOrd<Self> {}
}

pub mod convert {
    pub trait From<T>: Sized {
        fn from(value: T) -> Self;
    }
    pub trait Into<T>: Sized {
        fn into(self) -> T;
    }
    pub trait AsRef<T: ?Sized> {
        fn as_ref(&self) -> &T;
    }
    pub trait TryFrom<T>: Sized {
        type Error;
        fn try_from(value: T) -> Result<Self, Self::Error>;
    }
}

pub mod ops {
    pub trait Add<Rhs = Self> {
        type Output;
        fn add(self, rhs: Rhs) -> Self::Output;
    }
    pub trait Sub<Rhs = Self> {
        type Output;
        fn sub(self, rhs: Rhs) -> Self::Output;
    }
    pub trait Mul<Rhs = Self> {
        type Output;
        fn mul(self, rhs: Rhs) -> Self::Output;
    }
    pub trait Neg {
        type Output;
        fn neg(self) -> Self::Output;
    }
    pub trait Index<Idx: ?Sized> {
        type Output: ?Sized;
        fn index(&self, index: Idx) -> &Self::Output;
    }
    pub trait Deref {
        type Target: ?Sized;
        fn deref(&self) -> &Self::Target;
    }
    pub trait Drop {
        fn drop(&mut self);
    }
    pub trait FnOnce<Args> {
        type Output;
    }
    pub trait FnMut<Args>: FnOnce<Args> {}
    pub trait Fn<Args>: FnMut<Args> {}
}

pub mod iter {
    pub trait Iterator {
        type Item;
        fn next(&mut self) -> Option<Self::Item>;
        fn count(self) -> usize;
        fn collect<B: FromIterator<Self::Item>>(self) -> B;
    }
    pub trait IntoIterator {
        type Item;
        type IntoIter: Iterator<Item = Self::Item>;
        fn into_iter(self) -> Self::IntoIter;
    }
    pub trait FromIterator<A>: Sized {
        fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self;
    }
    pub trait DoubleEndedIterator: Iterator {
        fn next_back(&mut self) -> Option<Self::Item>;
    }
    pub trait ExactSizeIterator: Iterator {
        fn len(&self) -> usize;
    }
    pub trait Extend<A> {
        fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T);
    }
}

pub mod option {
    pub enum Option<T> {
        None,
        Some(T),
    }
    impl<T> Option<T> {
        pub fn is_some(&self) -> bool;
        pub fn is_none(&self) -> bool;
        pub fn unwrap(self) -> T;
        pub fn unwrap_or(self, default: T) -> T;
        pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Option<U>;
    }
}

pub mod result {
    pub enum Result<T, E> {
        Ok(T),
        Err(E),
    }
    impl<T, E> Result<T, E> {
        pub fn is_ok(&self) -> bool;
        pub fn is_err(&self) -> bool;
        pub fn unwrap(self) -> T;
        pub fn map_err<F, O: FnOnce(E) -> F>(self, op: O) -> Result<T, F>;
    }
}

pub mod boxed {
    pub struct Box<T: ?Sized>(*mut T);
    impl<T> Box<T> {
        pub fn new(x: T) -> Box<T>;
    }
}

pub mod string {
    pub struct String {
        vec: Vec<u8>,
    }
    impl String {
        pub fn new() -> String;
        pub fn len(&self) -> usize;
        pub fn push_str(&mut self, string: &str);
    }
    pub trait ToString {
        fn to_string(&self) -> String;
    }
}

pub mod vec {
    pub struct Vec<T> {
        ptr: *mut T,
        len: usize,
        cap: usize,
    }
    impl<T> Vec<T> {
        pub fn new() -> Vec<T>;
        pub fn with_capacity(capacity: usize) -> Vec<T>;
        pub fn push(&mut self, value: T);
        pub fn pop(&mut self) -> Option<T>;
        pub fn len(&self) -> usize;
        pub fn is_empty(&self) -> bool;
    }
}

pub mod collections {
    pub mod hash_map {
        pub struct RandomState;
        pub struct HashMap<K, V, S = RandomState> {
            hash_builder: S,
            table: *mut (K, V),
        }
        impl<K, V> HashMap<K, V, RandomState> {
            pub fn new() -> HashMap<K, V, RandomState>;
        }
        impl<K, V, S> HashMap<K, V, S> {
            pub fn len(&self) -> usize;
            pub fn insert(&mut self, k: K, v: V) -> Option<V>;
            pub fn get(&self, k: &K) -> Option<&V>;
        }
    }
    pub mod hash_set {
        pub struct HashSet<T, S = super::hash_map::RandomState> {
            map: super::hash_map::HashMap<T, (), S>,
        }
        impl<T> HashSet<T, super::hash_map::RandomState> {
            pub fn new() -> HashSet<T, super::hash_map::RandomState>;
        }
    }
    pub mod btree_map {
        pub struct BTreeMap<K, V> {
            root: *mut (K, V),
            length: usize,
        }
        impl<K, V> BTreeMap<K, V> {
            pub fn new() -> BTreeMap<K, V>;
        }
    }
    pub use self::btree_map::BTreeMap;
    pub use self::hash_map::HashMap;
    pub use self::hash_set::HashSet;
}

pub mod fmt {
    pub struct Formatter<'a> {
        buf: &'a mut String,
    }
    pub struct Error;
    pub type Result = crate::result::Result<(), Error>;
    pub trait Debug {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result;
    }
    pub trait Display {
        fn fmt(&self, f: &mut Formatter<'_>) -> Result;
    }
}

pub mod hash {
    pub trait Hash {}
    pub trait Hasher {
        fn finish(&self) -> u64;
    }
    pub trait BuildHasher {
        type Hasher: Hasher;
        fn build_hasher(&self) -> Self::Hasher;
    }
}

pub mod rc {
    pub struct Rc<T: ?Sized>(*const T);
    impl<T> Rc<T> {
        pub fn new(value: T) -> Rc<T>;
    }
}

pub mod sync {
    pub struct Arc<T: ?Sized>(*const T);
    impl<T> Arc<T> {
        pub fn new(data: T) -> Arc<T>;
    }
    pub struct Mutex<T: ?Sized>(*mut T);
}

pub mod prelude {
    pub use crate::boxed::Box;
    pub use crate::clone::Clone;
    pub use crate::cmp::{Eq, Ord, PartialEq, PartialOrd};
    pub use crate::convert::{AsRef, From, Into, TryFrom};
    pub use crate::default::Default;
    pub use crate::iter::{DoubleEndedIterator, ExactSizeIterator, Extend, FromIterator, IntoIterator, Iterator};
    pub use crate::marker::{Copy, Send, Sized, Sync, Unpin};
    pub use crate::ops::{Drop, Fn, FnMut, FnOnce};
    pub use crate::option::Option::{self, None, Some};
    pub use crate::result::Result::{self, Err, Ok};
    pub use crate::string::{String, ToString};
    pub use crate::vec::Vec;
    pub use crate::{assert, assert_eq, format, panic, println, vec};
}

#[macro_export]
macro_rules! vec {
    ($($x:expr),*) => { $crate::vec::Vec::new() };
}
#[macro_export]
macro_rules! format {
    ($($arg:tt)*) => { $crate::string::String::new() };
}
#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {};
}
#[macro_export]
macro_rules! panic {
    ($($arg:tt)*) => {};
}
#[macro_export]
macro_rules! assert {
    ($cond:expr) => {};
}
#[macro_export]
macro_rules! assert_eq {
    ($left:expr, $right:expr) => {};
}
"#;
