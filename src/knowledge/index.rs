//! Vector Index - 플랫(전수) 최근접 이웃 검색
//!
//! 빌드 이후 읽기 전용인 인메모리 인덱스입니다.
//! 위치 i의 벡터는 항상 코퍼스의 i번째 청크와 대응합니다.
//!
//! - L2: 벡터를 그대로 저장하고 제곱 L2 거리 오름차순으로 반환
//! - Cosine: 벡터를 L2 정규화한 뒤 내적(=코사인 유사도) 내림차순으로 반환

use std::fmt;
use std::str::FromStr;

use crate::error::{RagError, Result};

// ============================================================================
// Metric
// ============================================================================

/// 거리 메트릭
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// 유클리드 거리 (작을수록 가까움)
    #[default]
    L2,
    /// 코사인 유사도 (클수록 가까움)
    Cosine,
}

impl FromStr for Metric {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Metric::L2),
            "cosine" | "ip" => Ok(Metric::Cosine),
            other => Err(RagError::Config(format!(
                "Unknown metric '{}'. Use 'l2' or 'cosine'",
                other
            ))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::L2 => write!(f, "l2"),
            Metric::Cosine => write!(f, "cosine"),
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// 검색된 이웃
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// 인덱스 내 위치 (= 코퍼스 위치)
    pub position: usize,
    /// L2: 제곱 거리, Cosine: 유사도
    pub score: f32,
}

// ============================================================================
// FlatIndex
// ============================================================================

/// 전수 비교 벡터 인덱스
#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: Metric,
    dimension: usize,
    /// 행 우선으로 펼친 벡터
    data: Vec<f32>,
    len: usize,
}

impl FlatIndex {
    /// 벡터 목록으로 인덱스 빌드
    ///
    /// 빈 목록은 `EmptyCorpus`, 차원이 섞여 있으면 `DimensionMismatch`입니다.
    pub fn build(vectors: &[Vec<f32>], metric: Metric) -> Result<Self> {
        let first = vectors.first().ok_or(RagError::EmptyCorpus)?;
        let dimension = first.len();
        if dimension == 0 {
            return Err(RagError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for vector in vectors {
            if vector.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }

            match metric {
                Metric::L2 => data.extend_from_slice(vector),
                Metric::Cosine => data.extend(normalized(vector)),
            }
        }

        tracing::debug!(
            "Built {} index: {} vectors x {} dims",
            metric,
            vectors.len(),
            dimension
        );

        Ok(Self {
            metric,
            dimension,
            data,
            len: vectors.len(),
        })
    }

    /// k개의 최근접 이웃
    ///
    /// k가 벡터 수보다 크면 가능한 만큼만 반환합니다.
    /// 결과는 가까운 순서이며, 점수가 같으면 위치가 앞선 쪽이 먼저입니다.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Err(RagError::InvalidK(k));
        }

        let mut neighbors: Vec<Neighbor> = match self.metric {
            Metric::L2 => self
                .rows()
                .enumerate()
                .map(|(position, row)| Neighbor {
                    position,
                    score: squared_l2(row, query),
                })
                .collect(),
            Metric::Cosine => {
                let query = normalized(query);
                self.rows()
                    .enumerate()
                    .map(|(position, row)| Neighbor {
                        position,
                        score: dot(row, &query),
                    })
                    .collect()
            }
        };

        let metric = self.metric;
        neighbors.sort_by(|a, b| {
            rank_key(metric, a.score)
                .total_cmp(&rank_key(metric, b.score))
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    /// 저장된 벡터 수
    pub fn len(&self) -> usize {
        self.len
    }

    /// 비어 있는지 여부 (빌드 규칙상 항상 false)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 벡터 차원
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 메트릭
    pub fn metric(&self) -> Metric {
        self.metric
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 정렬 키 (작을수록 가까움, NaN 점수는 맨 뒤)
fn rank_key(metric: Metric, score: f32) -> f32 {
    if score.is_nan() {
        return f32::INFINITY;
    }
    match metric {
        Metric::L2 => score,
        Metric::Cosine => -score,
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// L2 정규화 (영벡터는 그대로)
fn normalized(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / n).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, i: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[i] = 1.0;
        v
    }

    #[test]
    fn test_l2_orders_by_distance() {
        let vectors: Vec<Vec<f32>> = (0..5).map(|i| axis(5, i)).collect();
        let index = FlatIndex::build(&vectors, Metric::L2).expect("index should build");

        // 축 2에 가장 가깝고, 그다음 축 4, 그다음 축 0
        let query = vec![0.2, 0.0, 0.9, 0.0, 0.4];
        let results = index.search(&query, 3).expect("search should succeed");

        let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![2, 4, 0]);
        assert!(results.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn test_cosine_orders_by_similarity() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 5.0], vec![3.0, 3.0]];
        let index = FlatIndex::build(&vectors, Metric::Cosine).expect("index should build");

        let results = index.search(&[0.0, 2.0], 3).expect("search should succeed");
        let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_k_larger_than_index_is_clipped() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let index = FlatIndex::build(&vectors, Metric::L2).expect("index should build");
        let results = index.search(&[1.0, 0.0], 10).expect("search should succeed");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_empty_corpus() {
        let result = FlatIndex::build(&[], Metric::L2);
        assert!(matches!(result, Err(RagError::EmptyCorpus)));
    }

    #[test]
    fn test_dimension_mismatch_on_build() {
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]];
        let result = FlatIndex::build(&vectors, Metric::L2);
        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                expected: 3,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_dimension_mismatch_on_query() {
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let index = FlatIndex::build(&vectors, Metric::L2).expect("index should build");
        let result = index.search(&[0.0, 0.0, 1.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                expected: 3,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_zero_k_rejected() {
        let index = FlatIndex::build(&[vec![1.0]], Metric::L2).expect("index should build");
        assert!(matches!(index.search(&[1.0], 0), Err(RagError::InvalidK(0))));
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("L2".parse::<Metric>().ok(), Some(Metric::L2));
        assert_eq!("cosine".parse::<Metric>().ok(), Some(Metric::Cosine));
        assert!("hamming".parse::<Metric>().is_err());
        assert_eq!(Metric::Cosine.to_string(), "cosine");
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let vectors = vec![vec![f32::NAN, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        for metric in [Metric::L2, Metric::Cosine] {
            let index = FlatIndex::build(&vectors, metric).expect("index should build");
            let results = index.search(&[1.0, 0.0], 3).expect("search should succeed");
            let positions: Vec<usize> = results.iter().map(|n| n.position).collect();
            assert_eq!(positions, vec![1, 2, 0], "metric {}", metric);
            assert!(results[2].score.is_nan());
        }
    }
}
