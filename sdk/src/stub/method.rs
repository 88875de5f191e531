use std::fmt;
use std::marker::PhantomData;

/// Typed address of one interface member.
///
/// `A` is the argument tuple (`()`, `(String,)`, `(i32, String)`, ...) and
/// `R` the return type. Declared as constants next to the interface:
///
/// ```ignore
/// pub const GREET: Method<(String,), String> = Method::new("greet");
/// ```
pub struct Method<A, R> {
    member: &'static str,
    _types: PhantomData<fn(A) -> R>,
}

impl<A, R> Method<A, R> {
    pub const fn new(member: &'static str) -> Self {
        Self {
            member,
            _types: PhantomData,
        }
    }

    pub fn member(&self) -> &'static str {
        self.member
    }
}

impl<A, R> Clone for Method<A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, R> Copy for Method<A, R> {}

impl<A, R> fmt::Debug for Method<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Method").field(&self.member).finish()
    }
}
