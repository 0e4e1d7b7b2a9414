pub mod cart;
pub mod compare;
pub mod search;
pub mod store;

pub use cart::{CartAction, CartState};
pub use compare::{CompareAction, CompareSelection, CompareState, Layout, Slot};
pub use search::{SearchAction, SearchState};
pub use store::{Action, RootState, Store};

pub mod prelude {
    pub use super::{
        Action, CartAction, CompareAction, CompareSelection, Layout, RootState, SearchAction,
        Slot, Store,
    };
}
