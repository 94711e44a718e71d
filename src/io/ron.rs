//! RON I/O
use crate::{
    tasks::{
        collective::CollectiveInput,
        linear::{IterativeInput, LinearSystem, SimpleIterationInput},
        matmul::MatrixPair,
        optimize::Minimum,
        reduction::{ReduceInput, VectorPair},
    },
    traits::{RONExport, RONImport},
    types::{CcsMatrix, CrsMatrix, DenseMatrix, Image, Point},
};

macro_rules! ron_io {
    ($($t:ty),* $(,)?) => {
        $(
            impl RONExport for $t {}
            impl RONImport for $t {}
        )*
    };
}

ron_io!(
    Image,
    Point,
    Vec<Point>,
    LinearSystem,
    IterativeInput,
    SimpleIterationInput,
    Minimum,
);

impl<T: serde::Serialize> RONExport for DenseMatrix<T> {}
impl<T: for<'de> serde::Deserialize<'de>> RONImport for DenseMatrix<T> {}
impl<T: serde::Serialize> RONExport for CrsMatrix<T> {}
impl<T: for<'de> serde::Deserialize<'de>> RONImport for CrsMatrix<T> {}
impl<T: serde::Serialize> RONExport for CcsMatrix<T> {}
impl<T: for<'de> serde::Deserialize<'de>> RONImport for CcsMatrix<T> {}
impl<M: serde::Serialize> RONExport for MatrixPair<M> {}
impl<M: for<'de> serde::Deserialize<'de>> RONImport for MatrixPair<M> {}
impl<T: serde::Serialize> RONExport for ReduceInput<T> {}
impl<T: for<'de> serde::Deserialize<'de>> RONImport for ReduceInput<T> {}
impl<T: serde::Serialize> RONExport for VectorPair<T> {}
impl<T: for<'de> serde::Deserialize<'de>> RONImport for VectorPair<T> {}
impl<T: serde::Serialize> RONExport for CollectiveInput<T> {}
impl<T: for<'de> serde::Deserialize<'de>> RONImport for CollectiveInput<T> {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::LocalUniverse;
    use crate::error::Error;
    use crate::runner::run_pipeline;
    use crate::tasks::{
        image::{GaussianBlurDistributed, GaussianBlurSeq},
        linear::GaussJordanSeq,
        matmul::{CannonSeq, DenseMultiplyDistributed, DenseMultiplySeq},
    };
    use crate::types::ReduceOp;

    #[test]
    fn test_system_export_and_import() {
        let system = LinearSystem::new(
            DenseMatrix::new(2, 2, vec![4.0, -1.0, 0.5, 3.0]).unwrap(),
            vec![1.0, 2.0],
        );
        let input = IterativeInput::new(system, 1e-8, 50);
        input.export_as_ron("_test_export_system.ron").unwrap();
        let imported = IterativeInput::import_from_ron("_test_export_system.ron").unwrap();
        assert_eq!(imported, input);
    }

    #[test]
    fn test_sparse_from_string() {
        let dense = DenseMatrix::new(2, 3, vec![0.0, 1.5, 0.0, -2.0, 0.0, 3.0]).unwrap();
        let crs = CrsMatrix::from_dense(&dense);
        let s = crs.to_ron_string().unwrap();
        let back = CrsMatrix::<f64>::from_ron_string(&s).unwrap();
        assert_eq!(back.to_dense(), dense);
    }

    #[test]
    fn test_reduce_input_from_string() {
        let input = ReduceInput::<i32>::from_ron_string("(values: [1, 2, 3], op: Max)").unwrap();
        assert_eq!(input, ReduceInput::new(vec![1, 2, 3], ReduceOp::Max));
    }

    #[test]
    fn test_malformed_string() {
        assert!(Image::from_ron_string("(width: 1").is_err());
    }

    #[test]
    fn test_short_image_fails_validation() {
        let image = Image::from_ron_string("(width: 3, height: 3, channels: 1, pixels: [1, 2])")
            .unwrap();
        assert!(!image.is_consistent());
        assert!(matches!(
            run_pipeline(GaussianBlurSeq::new(image.clone())),
            Err(Error::ValidationFailed)
        ));
        let result = LocalUniverse::new(2)
            .run(|comm| run_pipeline(GaussianBlurDistributed::new(comm, image.clone())));
        assert!(matches!(result, Err(Error::ValidationFailed)));
    }

    #[test]
    fn test_short_matrix_fails_validation() {
        let a = DenseMatrix::<f64>::from_ron_string("(rows: 2, cols: 2, data: [1.0])").unwrap();
        assert!(!a.is_consistent());
        let pair = MatrixPair::new(a, DenseMatrix::identity(2));
        assert!(matches!(
            run_pipeline(DenseMultiplySeq::new(pair.clone())),
            Err(Error::ValidationFailed)
        ));
        assert!(matches!(
            run_pipeline(CannonSeq::new(pair.clone(), 2)),
            Err(Error::ValidationFailed)
        ));
        let result = LocalUniverse::new(3)
            .run(|comm| run_pipeline(DenseMultiplyDistributed::new(comm, pair.clone())));
        assert!(matches!(result, Err(Error::ValidationFailed)));
    }

    #[test]
    fn test_short_system_fails_validation() {
        let system = LinearSystem::from_ron_string(
            "(matrix: (rows: 2, cols: 2, data: [4.0]), rhs: [1.0, 2.0])",
        )
        .unwrap();
        assert!(!system.is_well_formed());
        assert!(matches!(
            run_pipeline(GaussJordanSeq::new(system)),
            Err(Error::ValidationFailed)
        ));
    }
}
