// MIT LICENSE
//
// Copyright (c) 2021 Dash Core Group
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Wrapper carrying an operation's value together with its cost.

use crate::OperationCost;

/// Wrapped operation result with associated cost.
#[must_use]
#[derive(Debug, Eq, PartialEq)]
pub struct CostContext<T> {
    /// Wrapped operation's return value.
    pub value: T,
    /// Cost of the operation.
    pub cost: OperationCost,
}

impl<T> CostContext<T> {
    /// Take wrapped value out adding its cost to provided accumulator.
    pub fn unwrap_add_cost(self, acc_cost: &mut OperationCost) -> T {
        *acc_cost += self.cost;
        self.value
    }

    /// Take wrapped value out dropping cost data.
    pub fn unwrap(self) -> T {
        self.value
    }

    /// Borrow costs data.
    pub fn cost(&self) -> &OperationCost {
        &self.cost
    }

    /// Borrow wrapped data.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Applies function to wrapped value keeping cost the same as before.
    pub fn map<B>(self, f: impl FnOnce(T) -> B) -> CostContext<B> {
        CostContext {
            value: f(self.value),
            cost: self.cost,
        }
    }

    /// Applies function to wrapped value adding costs.
    pub fn flat_map<B>(self, f: impl FnOnce(T) -> CostContext<B>) -> CostContext<B> {
        let mut cost = self.cost;
        let value = f(self.value).unwrap_add_cost(&mut cost);
        CostContext { value, cost }
    }

    /// Adds previously accumulated cost
    pub fn add_cost(mut self, cost: OperationCost) -> Self {
        self.cost += cost;
        self
    }
}

/// Type alias for `Result` wrapped into `CostContext`.
pub type CostResult<T, E> = CostContext<Result<T, E>>;

impl<T, E> CostResult<T, E> {
    /// Applies function to wrapped value in case of `Ok` keeping cost the same
    /// as before.
    pub fn map_ok<B>(self, f: impl FnOnce(T) -> B) -> CostResult<B, E> {
        self.map(|result| result.map(f))
    }

    /// Applies function to wrapped value in case of `Err` keeping cost the same
    /// as before.
    pub fn map_err<B>(self, f: impl FnOnce(E) -> B) -> CostResult<T, B> {
        self.map(|result| result.map_err(f))
    }

    /// Applies function to wrapped result in case of `Ok` adding costs.
    pub fn flat_map_ok<B>(self, f: impl FnOnce(T) -> CostResult<B, E>) -> CostResult<B, E> {
        let mut cost = self.cost;
        let value = match self.value {
            Ok(x) => f(x).unwrap_add_cost(&mut cost),
            Err(e) => Err(e),
        };
        CostContext { value, cost }
    }
}

impl<T, E> CostResult<Result<T, E>, E> {
    /// Flattens nested errors inside `CostContext`
    pub fn flatten(self) -> CostResult<T, E> {
        self.map(|value| value.and_then(|inner| inner))
    }
}

/// Extension trait to add costs context to values.
pub trait CostsExt {
    /// Wraps any value into a `CostContext` object with provided costs.
    fn wrap_with_cost(self, cost: OperationCost) -> CostContext<Self>
    where
        Self: Sized,
    {
        CostContext { value: self, cost }
    }

    /// Wraps any value into `CostContext` object with costs computed using the
    /// value getting wrapped.
    fn wrap_fn_cost(self, f: impl FnOnce(&Self) -> OperationCost) -> CostContext<Self>
    where
        Self: Sized,
    {
        CostContext {
            cost: f(&self),
            value: self,
        }
    }
}

impl<T> CostsExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(bytes: u64) -> OperationCost {
        OperationCost::with_storage_loaded_bytes(bytes)
    }

    #[test]
    fn flat_map_ok_skips_closure_on_error() {
        let initial: CostResult<usize, ()> = Err(()).wrap_with_cost(loaded(3));
        let mut executed = false;
        let mapped = initial.flat_map_ok(|x| {
            executed = true;
            Ok(x + 1).wrap_with_cost(loaded(7))
        });

        assert!(!executed);
        assert_eq!(mapped, Err(()).wrap_with_cost(loaded(3)));
    }

    #[test]
    fn flat_map_ok_adds_costs_of_both_steps() {
        let initial: CostResult<usize, ()> = Ok(75).wrap_with_cost(loaded(3));
        let mapped = initial.flat_map_ok(|x| Ok(x + 25).wrap_with_cost(loaded(7)));
        assert_eq!(mapped, Ok(100).wrap_with_cost(loaded(10)));
    }

    #[test]
    fn flatten_prefers_outer_error() {
        let outer: CostResult<Result<usize, &str>, &str> = Err("outer").wrap_with_cost(loaded(1));
        assert_eq!(outer.flatten().unwrap(), Err("outer"));

        let inner: CostResult<Result<usize, &str>, &str> =
            Ok(Err("inner")).wrap_with_cost(loaded(1));
        assert_eq!(inner.flatten().unwrap(), Err("inner"));

        let ok: CostResult<Result<usize, &str>, &str> = Ok(Ok(5)).wrap_with_cost(loaded(1));
        let flat = ok.flatten();
        assert_eq!(flat.cost, loaded(1));
        assert_eq!(flat.value, Ok(5));
    }

    #[test]
    fn wrap_fn_cost_derives_cost_from_value() {
        let bytes = b"node";
        let ctx = bytes.wrap_fn_cost(|b| OperationCost {
            seek_count: 1,
            storage_loaded_bytes: b.len() as u64,
            ..Default::default()
        });
        assert_eq!(ctx.cost.storage_loaded_bytes, 4);
        assert_eq!(ctx.cost.seek_count, 1);
    }
}
