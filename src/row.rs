//! Fixed-arity typed rows.
//!
//! A `Row<T>` wraps a tuple of cell values. Each tuple element is a type
//! implementing [`IntoCell`]; wrap it in `Option` to make that cell
//! nullable. Accessors are generated per arity so `cell3` only exists on
//! rows with at least three cells.

use crate::model::{Cell, IntoCell, SqlType};
use std::hash::{Hash, Hasher};

/// Tuple shapes usable as row contents.
pub trait Cells: Clone {
    const ARITY: usize;

    /// Column type and nullability for each position, in order.
    fn column_types() -> Vec<(SqlType, bool)>;

    fn to_cells(&self) -> Vec<Cell>;
}

#[derive(Debug, Clone)]
pub struct Row<T> {
    cells: T,
}

impl<T: Cells> Row<T> {
    pub fn new(cells: T) -> Self {
        Self { cells }
    }

    pub fn arity(&self) -> usize {
        T::ARITY
    }

    pub fn cells(&self) -> &T {
        &self.cells
    }

    pub fn into_inner(self) -> T {
        self.cells
    }

    pub fn to_cells(&self) -> Vec<Cell> {
        self.cells.to_cells()
    }
}

// Equality and hashing go through `Cell` so float cells compare bitwise
// and every row shape is hashable.
impl<T: Cells> PartialEq for Row<T> {
    fn eq(&self, other: &Self) -> bool {
        self.to_cells() == other.to_cells()
    }
}

impl<T: Cells> Eq for Row<T> {}

impl<T: Cells> Hash for Row<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_cells().hash(state);
    }
}

macro_rules! row_arity {
    ($ctor:ident, $n:expr; $($idx:tt: $T:ident $v:ident $get:ident $set:ident),+) => {
        impl<$($T: IntoCell),+> Cells for ($($T,)+) {
            const ARITY: usize = $n;

            fn column_types() -> Vec<(SqlType, bool)> {
                vec![$(($T::SQL_TYPE, $T::NULLABLE)),+]
            }

            fn to_cells(&self) -> Vec<Cell> {
                vec![$(self.$idx.clone().into_cell()),+]
            }
        }

        impl<$($T: IntoCell),+> Row<($($T,)+)> {
            $(
                pub fn $get(&self) -> &$T {
                    &self.cells.$idx
                }

                pub fn $set(&self, value: $T) -> Self {
                    let mut cells = self.cells.clone();
                    cells.$idx = value;
                    Row { cells }
                }
            )+
        }

        pub fn $ctor<$($T: IntoCell),+>($($v: $T),+) -> Row<($($T,)+)> {
            Row::new(($($v,)+))
        }
    };
}

row_arity!(row1, 1;
    0: A a cell1 set_cell1);
row_arity!(row2, 2;
    0: A a cell1 set_cell1, 1: B b cell2 set_cell2);
row_arity!(row3, 3;
    0: A a cell1 set_cell1, 1: B b cell2 set_cell2, 2: C c cell3 set_cell3);
row_arity!(row4, 4;
    0: A a cell1 set_cell1, 1: B b cell2 set_cell2, 2: C c cell3 set_cell3,
    3: D d cell4 set_cell4);
row_arity!(row5, 5;
    0: A a cell1 set_cell1, 1: B b cell2 set_cell2, 2: C c cell3 set_cell3,
    3: D d cell4 set_cell4, 4: E e cell5 set_cell5);
row_arity!(row6, 6;
    0: A a cell1 set_cell1, 1: B b cell2 set_cell2, 2: C c cell3 set_cell3,
    3: D d cell4 set_cell4, 4: E e cell5 set_cell5, 5: F f cell6 set_cell6);
row_arity!(row7, 7;
    0: A a cell1 set_cell1, 1: B b cell2 set_cell2, 2: C c cell3 set_cell3,
    3: D d cell4 set_cell4, 4: E e cell5 set_cell5, 5: F f cell6 set_cell6,
    6: G g cell7 set_cell7);
row_arity!(row8, 8;
    0: A a cell1 set_cell1, 1: B b cell2 set_cell2, 2: C c cell3 set_cell3,
    3: D d cell4 set_cell4, 4: E e cell5 set_cell5, 5: F f cell6 set_cell6,
    6: G g cell7 set_cell7, 7: H h cell8 set_cell8);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn set_cell_leaves_original_untouched() {
        let r1 = row3(1i64, "a", Some(2.5f64));
        let r2 = r1.set_cell1(9);

        assert_eq!(*r1.cell1(), 1);
        assert_eq!(*r2.cell1(), 9);
        assert_eq!(r2.cell2(), r1.cell2());
        assert_eq!(r2.cell3(), r1.cell3());
    }

    #[test]
    fn equality_is_structural_with_nulls() {
        let a = row2(None::<i32>, Some("x"));
        let b = row2(None::<i32>, Some("x"));
        let c = row2(Some(1), Some("x"));

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn column_types_follow_the_tuple() {
        let types = <(i32, Option<String>, f64) as Cells>::column_types();
        assert_eq!(
            types,
            vec![
                (SqlType::Integer, false),
                (SqlType::Varchar, true),
                (SqlType::Double, false)
            ]
        );
        assert_eq!(row1(true).arity(), 1);
    }
}
